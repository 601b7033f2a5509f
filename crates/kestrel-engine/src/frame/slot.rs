use ash::vk;

use crate::error::Result;

/// Synchronization objects and command buffer owned by one frame-in-flight slot.
#[derive(Debug, Copy, Clone)]
pub struct FrameSlot {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    /// Created signalled so the first wait on each slot returns immediately.
    pub in_flight: vk::Fence,
    pub command_buffer: vk::CommandBuffer,
}

/// Creates `count` slots with command buffers from `pool`.
pub fn create_slots(device: &ash::Device, pool: vk::CommandPool, count: usize) -> Result<Vec<FrameSlot>> {
    let alloc = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(count as u32);
    let buffers = unsafe { device.allocate_command_buffers(&alloc)? };

    let mut slots: Vec<FrameSlot> = Vec::with_capacity(count);
    for command_buffer in buffers.iter().copied() {
        match create_sync(device) {
            Ok((image_available, render_finished, in_flight)) => slots.push(FrameSlot {
                image_available,
                render_finished,
                in_flight,
                command_buffer,
            }),
            Err(e) => {
                unsafe {
                    for s in &slots {
                        destroy_sync(device, s);
                    }
                    device.free_command_buffers(pool, &buffers);
                }
                return Err(e);
            }
        }
    }
    Ok(slots)
}

fn create_sync(device: &ash::Device) -> Result<(vk::Semaphore, vk::Semaphore, vk::Fence)> {
    let semaphore_info = vk::SemaphoreCreateInfo::default();
    let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
    unsafe {
        let image_available = device.create_semaphore(&semaphore_info, None)?;
        let render_finished = match device.create_semaphore(&semaphore_info, None) {
            Ok(s) => s,
            Err(e) => {
                device.destroy_semaphore(image_available, None);
                return Err(e.into());
            }
        };
        match device.create_fence(&fence_info, None) {
            Ok(fence) => Ok((image_available, render_finished, fence)),
            Err(e) => {
                device.destroy_semaphore(image_available, None);
                device.destroy_semaphore(render_finished, None);
                Err(e.into())
            }
        }
    }
}

unsafe fn destroy_sync(device: &ash::Device, slot: &FrameSlot) {
    unsafe {
        device.destroy_fence(slot.in_flight, None);
        device.destroy_semaphore(slot.render_finished, None);
        device.destroy_semaphore(slot.image_available, None);
    }
}

/// Destroys the slots' sync objects. Command buffers go with their pool.
pub(crate) unsafe fn destroy_slots(device: &ash::Device, slots: &mut Vec<FrameSlot>) {
    for s in slots.drain(..) {
        unsafe { destroy_sync(device, &s) };
    }
}
