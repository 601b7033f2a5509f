use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::error::{EngineError, Result};

/// Per-frame camera uniform, binding 0 of set 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ViewProjection {
    pub projection: Mat4,
    pub view: Mat4,
}

impl Default for ViewProjection {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        }
    }
}

/// Per-object model matrix. Pushed as a constant and mirrored into the
/// dynamic uniform buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ModelTransform {
    pub model: Mat4,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self { model: Mat4::IDENTITY }
    }
}

/// Rounds `size` up to a multiple of `align`. An alignment of zero means
/// the device imposes none.
pub fn aligned_stride(size: u64, align: u64) -> u64 {
    if align == 0 {
        return size;
    }
    size.div_ceil(align) * align
}

/// Host-side staging for the dynamic transform buffer: `capacity` slots,
/// each `stride` bytes apart.
#[derive(Debug, Clone, Default)]
pub struct TransferSpace {
    bytes: Vec<u8>,
    stride: usize,
    capacity: usize,
}

impl TransferSpace {
    pub fn new(capacity: usize, min_alignment: u64) -> Self {
        let stride = aligned_stride(size_of::<ModelTransform>() as u64, min_alignment) as usize;
        Self {
            bytes: vec![0; stride * capacity],
            stride,
            capacity,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stores `transform` in slot `index`.
    pub fn write(&mut self, index: usize, transform: &ModelTransform) -> Result<()> {
        if index >= self.capacity {
            return Err(EngineError::ObjectCapacityExceeded {
                capacity: self.capacity,
            });
        }
        let start = index * self.stride;
        let src = bytemuck::bytes_of(transform);
        self.bytes[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Reads slot `index` back.
    pub fn read(&self, index: usize) -> Option<ModelTransform> {
        if index >= self.capacity {
            return None;
        }
        let start = index * self.stride;
        let len = size_of::<ModelTransform>();
        Some(bytemuck::pod_read_unaligned(&self.bytes[start..start + len]))
    }

    /// Bytes for the first `count` slots, ready to copy into the buffer.
    pub fn bytes(&self, count: usize) -> &[u8] {
        &self.bytes[..count.min(self.capacity) * self.stride]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniform_layouts_are_std140_sized() {
        assert_eq!(size_of::<ViewProjection>(), 128);
        assert_eq!(size_of::<ModelTransform>(), 64);
    }

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(aligned_stride(64, 256), 256);
        assert_eq!(aligned_stride(64, 64), 64);
        assert_eq!(aligned_stride(65, 64), 128);
        assert_eq!(aligned_stride(64, 0), 64);
    }

    #[test]
    fn slots_do_not_overlap() {
        let mut space = TransferSpace::new(4, 256);
        assert_eq!(space.stride(), 256);
        assert_eq!(space.bytes(4).len(), 1024);

        let a = ModelTransform { model: Mat4::from_translation(Vec3::X) };
        let b = ModelTransform { model: Mat4::from_scale(Vec3::splat(2.0)) };
        space.write(0, &a).unwrap();
        space.write(1, &b).unwrap();

        assert_eq!(space.read(0), Some(a));
        assert_eq!(space.read(1), Some(b));
        assert_eq!(space.read(2), Some(ModelTransform::zeroed()));
    }

    #[test]
    fn write_past_capacity_fails() {
        let mut space = TransferSpace::new(2, 64);
        let err = space.write(2, &ModelTransform::default()).unwrap_err();
        assert!(matches!(err, EngineError::ObjectCapacityExceeded { capacity: 2 }));
        assert_eq!(space.read(2), None);
    }
}
