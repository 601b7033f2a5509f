use ash::vk;

/// Number of levels in a full mip chain down to 1×1.
pub fn mip_levels(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    32 - largest.leading_zeros()
}

/// One downsampling step: blit level `level - 1` (`src`) into `level` (`dst`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MipBlit {
    pub level: u32,
    pub src: vk::Offset3D,
    pub dst: vk::Offset3D,
}

/// Blit plan that halves each dimension per level, never below 1.
pub fn mip_chain(width: u32, height: u32) -> Vec<MipBlit> {
    let levels = mip_levels(width, height);
    let mut w = width.max(1) as i32;
    let mut h = height.max(1) as i32;

    (1..levels)
        .map(|level| {
            let next_w = (w / 2).max(1);
            let next_h = (h / 2).max(1);
            let blit = MipBlit {
                level,
                src: vk::Offset3D { x: w, y: h, z: 1 },
                dst: vk::Offset3D { x: next_w, y: next_h, z: 1 },
            };
            w = next_w;
            h = next_h;
            blit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_counts() {
        assert_eq!(mip_levels(512, 512), 10);
        assert_eq!(mip_levels(300, 300), 9);
        assert_eq!(mip_levels(300, 200), 9);
        assert_eq!(mip_levels(1, 1), 1);
        assert_eq!(mip_levels(1024, 1), 11);
    }

    #[test]
    fn chain_ends_at_one_by_one() {
        let chain = mip_chain(8, 2);
        assert_eq!(chain.len() as u32, mip_levels(8, 2) - 1);
        let dims: Vec<(i32, i32)> = chain.iter().map(|b| (b.dst.x, b.dst.y)).collect();
        assert_eq!(dims, [(4, 1), (2, 1), (1, 1)]);
        assert_eq!(chain[0].src, vk::Offset3D { x: 8, y: 2, z: 1 });
    }

    #[test]
    fn each_step_reads_the_previous_destination() {
        let chain = mip_chain(300, 200);
        for pair in chain.windows(2) {
            assert_eq!(pair[0].dst, pair[1].src);
            assert_eq!(pair[0].level + 1, pair[1].level);
        }
    }

    #[test]
    fn single_texel_needs_no_blits() {
        assert!(mip_chain(1, 1).is_empty());
    }
}
