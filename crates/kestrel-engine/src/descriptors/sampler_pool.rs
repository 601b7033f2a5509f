use ash::vk;

use crate::error::{EngineError, Result};

use super::layouts;

/// Tries `alloc` on the newest pool; on exhaustion appends a pool from
/// `create` and retries once.
pub(crate) fn allocate_growing<P, S>(
    pools: &mut Vec<P>,
    mut create: impl FnMut() -> Result<P>,
    mut alloc: impl FnMut(&P) -> Result<S>,
) -> Result<S> {
    if let Some(pool) = pools.last() {
        match alloc(pool) {
            Err(EngineError::DescriptorPoolExhausted) => {}
            other => return other,
        }
    }
    pools.push(create()?);
    match pools.last() {
        Some(pool) => alloc(pool),
        None => Err(EngineError::DescriptorPoolExhausted),
    }
}

/// Sampler descriptor sets, one per texture, carved from a growing chain of pools.
#[derive(Default)]
pub struct SamplerPools {
    layout: vk::DescriptorSetLayout,
    pools: Vec<vk::DescriptorPool>,
    sets_per_pool: u32,
}

impl SamplerPools {
    pub fn new(device: &ash::Device, sets_per_pool: u32) -> Result<Self> {
        let layout = layouts::create_set_layout(device, &layouts::sampler_layout_bindings())?;
        Ok(Self {
            layout,
            pools: Vec::new(),
            sets_per_pool: sets_per_pool.max(1),
        })
    }

    pub fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Allocates a set pointing at `view` sampled through `sampler`.
    pub fn allocate(
        &mut self,
        device: &ash::Device,
        view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> Result<vk::DescriptorSet> {
        let set_layouts = [self.layout];
        let per_pool = self.sets_per_pool;
        let set = allocate_growing(
            &mut self.pools,
            || {
                log::debug!("adding sampler descriptor pool of {per_pool} sets");
                layouts::create_pool(device, &layouts::sampler_pool_sizes(per_pool), per_pool)
            },
            |&pool| {
                let info = vk::DescriptorSetAllocateInfo::default()
                    .descriptor_pool(pool)
                    .set_layouts(&set_layouts);
                let sets = unsafe { device.allocate_descriptor_sets(&info)? };
                Ok(sets[0])
            },
        )?;

        let image_info = [vk::DescriptorImageInfo::default()
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .image_view(view)
            .sampler(sampler)];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(0)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info);
        unsafe { device.update_descriptor_sets(&[write], &[]) };

        Ok(set)
    }

    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            for pool in self.pools.drain(..) {
                device.destroy_descriptor_pool(pool, None);
            }
            if self.layout != vk::DescriptorSetLayout::null() {
                device.destroy_descriptor_set_layout(self.layout, None);
                self.layout = vk::DescriptorSetLayout::null();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pool stand-in: remaining capacity.
    struct FakePool(std::cell::Cell<u32>);

    fn take(pool: &FakePool) -> Result<u32> {
        match pool.0.get() {
            0 => Err(EngineError::DescriptorPoolExhausted),
            n => {
                pool.0.set(n - 1);
                Ok(n)
            }
        }
    }

    #[test]
    fn first_allocation_creates_a_pool() {
        let mut pools = Vec::new();
        allocate_growing(&mut pools, || Ok(FakePool(2.into())), take).unwrap();
        assert_eq!(pools.len(), 1);
    }

    #[test]
    fn exhaustion_appends_a_pool() {
        let mut pools = Vec::new();
        for _ in 0..5 {
            allocate_growing(&mut pools, || Ok(FakePool(2.into())), take).unwrap();
        }
        assert_eq!(pools.len(), 3);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let mut pools = vec![FakePool(1.into())];
        let mut created = 0;
        let err = allocate_growing(
            &mut pools,
            || {
                created += 1;
                Ok(FakePool(1.into()))
            },
            |_| -> Result<u32> { Err(EngineError::Vulkan(vk::Result::ERROR_DEVICE_LOST)) },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Vulkan(_)));
        assert_eq!(created, 0);
    }
}
