use ash::vk;

use crate::device::DeviceContext;
use crate::error::Result;
use crate::memory::Buffer;

use super::layouts;
use super::uniforms::{TransferSpace, ViewProjection};

/// Per-swapchain-image uniform buffers and the sets that bind them.
///
/// Image `i` owns a camera buffer, a dynamic transform buffer and set `i`.
#[derive(Default)]
pub struct UniformSets {
    layout: vk::DescriptorSetLayout,
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
    camera_buffers: Vec<Buffer>,
    model_buffers: Vec<Buffer>,
    transfer: TransferSpace,
}

impl UniformSets {
    pub fn new(ctx: &DeviceContext, image_count: usize, max_objects: usize) -> Result<Self> {
        let device = ctx.device();
        let align = ctx.limits().min_uniform_buffer_offset_alignment;
        let transfer = TransferSpace::new(max_objects, align);
        log::debug!(
            "dynamic transform stride {} bytes ({} objects, alignment {align})",
            transfer.stride(),
            max_objects
        );

        let layout = layouts::create_set_layout(device, &layouts::uniform_layout_bindings())?;
        let mut this = Self {
            layout,
            pool: vk::DescriptorPool::null(),
            sets: Vec::new(),
            camera_buffers: Vec::with_capacity(image_count),
            model_buffers: Vec::with_capacity(image_count),
            transfer,
        };
        if let Err(e) = this.build(ctx, image_count) {
            unsafe { this.destroy(device) };
            return Err(e);
        }
        Ok(this)
    }

    fn build(&mut self, ctx: &DeviceContext, image_count: usize) -> Result<()> {
        let device = ctx.device();
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let camera_size = size_of::<ViewProjection>() as vk::DeviceSize;
        let model_size = (self.transfer.stride() * self.transfer.capacity()) as vk::DeviceSize;

        for _ in 0..image_count {
            self.camera_buffers.push(Buffer::new(
                ctx,
                camera_size,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                host,
            )?);
            self.model_buffers.push(Buffer::new(
                ctx,
                model_size,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                host,
            )?);
        }

        let plan = layouts::uniform_set_plan(image_count);
        self.pool = layouts::create_pool(device, &plan.pool_sizes, plan.max_sets)?;

        let set_layouts = vec![self.layout; plan.set_count];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&set_layouts);
        self.sets = unsafe { device.allocate_descriptor_sets(&info)? };

        for (i, &set) in self.sets.iter().enumerate() {
            let camera = [vk::DescriptorBufferInfo::default()
                .buffer(self.camera_buffers[i].handle)
                .offset(0)
                .range(camera_size)];
            let model = [vk::DescriptorBufferInfo::default()
                .buffer(self.model_buffers[i].handle)
                .offset(0)
                .range(self.transfer.stride() as vk::DeviceSize)];
            let writes = [
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&camera),
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(1)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                    .buffer_info(&model),
            ];
            unsafe { device.update_descriptor_sets(&writes, &[]) };
        }
        Ok(())
    }

    pub fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    pub fn set(&self, image_index: usize) -> vk::DescriptorSet {
        self.sets[image_index]
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn stride(&self) -> usize {
        self.transfer.stride()
    }

    pub fn transfer_mut(&mut self) -> &mut TransferSpace {
        &mut self.transfer
    }

    /// Copies the camera and the first `objects` transform slots into the
    /// buffers owned by `image_index`.
    pub fn update(
        &self,
        device: &ash::Device,
        image_index: usize,
        camera: &ViewProjection,
        objects: usize,
    ) -> Result<()> {
        self.camera_buffers[image_index].write_bytes(device, 0, bytemuck::bytes_of(camera))?;
        self.model_buffers[image_index].write_bytes(device, 0, self.transfer.bytes(objects))?;
        Ok(())
    }

    /// Releases buffers, sets and the pool but keeps the layout, so the
    /// pipeline stays valid across a rebuild.
    pub(crate) unsafe fn release(&mut self, device: &ash::Device) {
        unsafe {
            for mut b in self.camera_buffers.drain(..).chain(self.model_buffers.drain(..)) {
                b.destroy(device);
            }
            if self.pool != vk::DescriptorPool::null() {
                device.destroy_descriptor_pool(self.pool, None);
                self.pool = vk::DescriptorPool::null();
            }
        }
        self.sets.clear();
    }

    /// Rebuilds per-image resources for a new swapchain image count.
    pub(crate) fn rebuild(&mut self, ctx: &DeviceContext, image_count: usize) -> Result<()> {
        unsafe { self.release(ctx.device()) };
        self.build(ctx, image_count)
    }

    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            self.release(device);
            if self.layout != vk::DescriptorSetLayout::null() {
                device.destroy_descriptor_set_layout(self.layout, None);
                self.layout = vk::DescriptorSetLayout::null();
            }
        }
    }
}
