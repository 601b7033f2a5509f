use ash::vk;

use crate::error::Result;

/// Set 0: camera uniform (binding 0) and per-object dynamic uniform (binding 1).
pub fn uniform_layout_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 2] {
    [
        vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX),
        vk::DescriptorSetLayoutBinding::default()
            .binding(1)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX),
    ]
}

/// Set 1: one combined image sampler read by the fragment stage.
pub fn sampler_layout_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 1] {
    [vk::DescriptorSetLayoutBinding::default()
        .binding(0)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::FRAGMENT)]
}

/// Pool sizes for exactly one uniform set per swapchain image.
pub fn uniform_pool_sizes(image_count: u32) -> [vk::DescriptorPoolSize; 2] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: image_count,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
            descriptor_count: image_count,
        },
    ]
}

/// Pool and allocation shape for the per-image uniform sets.
#[derive(Debug, Clone)]
pub struct UniformSetPlan {
    pub pool_sizes: [vk::DescriptorPoolSize; 2],
    pub max_sets: u32,
    /// Number of sets allocated in one call, one per swapchain image.
    pub set_count: usize,
}

// `vk::DescriptorPoolSize` does not implement `PartialEq`, so compare fields
// structurally, as the derive would.
impl PartialEq for UniformSetPlan {
    fn eq(&self, other: &Self) -> bool {
        self.pool_sizes
            .iter()
            .zip(other.pool_sizes.iter())
            .all(|(a, b)| a.ty == b.ty && a.descriptor_count == b.descriptor_count)
            && self.max_sets == other.max_sets
            && self.set_count == other.set_count
    }
}

impl Eq for UniformSetPlan {}

pub fn uniform_set_plan(image_count: usize) -> UniformSetPlan {
    let count = image_count as u32;
    UniformSetPlan {
        pool_sizes: uniform_pool_sizes(count),
        max_sets: count,
        set_count: image_count,
    }
}

pub fn sampler_pool_sizes(max_sets: u32) -> [vk::DescriptorPoolSize; 1] {
    [vk::DescriptorPoolSize {
        ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        descriptor_count: max_sets,
    }]
}

pub fn create_set_layout(
    device: &ash::Device,
    bindings: &[vk::DescriptorSetLayoutBinding<'_>],
) -> Result<vk::DescriptorSetLayout> {
    let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
    Ok(unsafe { device.create_descriptor_set_layout(&info, None)? })
}

pub fn create_pool(
    device: &ash::Device,
    sizes: &[vk::DescriptorPoolSize],
    max_sets: u32,
) -> Result<vk::DescriptorPool> {
    let info = vk::DescriptorPoolCreateInfo::default()
        .max_sets(max_sets)
        .pool_sizes(sizes);
    Ok(unsafe { device.create_descriptor_pool(&info, None)? })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_set_has_static_and_dynamic_bindings() {
        let b = uniform_layout_bindings();
        assert_eq!(b[0].binding, 0);
        assert_eq!(b[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(b[1].binding, 1);
        assert_eq!(b[1].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC);
        assert!(b.iter().all(|b| b.stage_flags == vk::ShaderStageFlags::VERTEX));
    }

    #[test]
    fn sampler_set_is_fragment_only() {
        let [b] = sampler_layout_bindings();
        assert_eq!(b.descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(b.stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn uniform_sets_match_image_count() {
        for images in [2, 3, 4] {
            let plan = uniform_set_plan(images);
            assert_eq!(plan.set_count, images);
            assert_eq!(plan.max_sets as usize, images);
            assert!(plan.pool_sizes.iter().all(|s| s.descriptor_count as usize == images));
        }
    }

    #[test]
    fn rebuild_for_fewer_images_shrinks_the_plan() {
        let before = uniform_set_plan(3);
        let after = uniform_set_plan(2);
        assert_eq!(before.set_count, 3);
        assert_eq!(after.set_count, 2);
        assert_eq!(after.max_sets, 2);
        assert_ne!(before, after);
    }

    #[test]
    fn uniform_pool_matches_image_count() {
        for images in [2, 3, 4] {
            let sizes = uniform_pool_sizes(images);
            assert!(sizes.iter().all(|s| s.descriptor_count == images));
        }
    }
}
