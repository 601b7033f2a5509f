use ash::vk;

use crate::device::DeviceContext;
use crate::error::Result;

/// Access masks and pipeline stages for one layout transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TransitionMasks {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier parameters for the transitions texture upload needs.
///
/// Other pairs are a programming error and return `None`.
pub fn transition_masks(old: vk::ImageLayout, new: vk::ImageLayout) -> Option<TransitionMasks> {
    match (old, new) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Some(TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        }),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Some(TransitionMasks {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        _ => None,
    }
}

/// Records `record` into a transient command buffer, submits it to the
/// graphics queue and waits for the queue to drain.
pub fn submit_once<F>(ctx: &DeviceContext, pool: vk::CommandPool, record: F) -> Result<()>
where
    F: FnOnce(&ash::Device, vk::CommandBuffer),
{
    let device = ctx.device();
    let alloc = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);
    let buffers = unsafe { device.allocate_command_buffers(&alloc)? };
    let cmd = buffers[0];

    let result = (|| {
        let begin = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(cmd, &begin)? };
        record(device, cmd);
        unsafe { device.end_command_buffer(cmd)? };

        let submit = vk::SubmitInfo::default().command_buffers(&buffers);
        unsafe {
            device.queue_submit(ctx.graphics_queue(), &[submit], vk::Fence::null())?;
            device.queue_wait_idle(ctx.graphics_queue())?;
        }
        Ok(())
    })();

    unsafe { device.free_command_buffers(pool, &buffers) };
    result
}

pub fn copy_buffer(
    ctx: &DeviceContext,
    pool: vk::CommandPool,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
) -> Result<()> {
    submit_once(ctx, pool, |device, cmd| {
        let region = vk::BufferCopy::default().size(size);
        unsafe { device.cmd_copy_buffer(cmd, src, dst, &[region]) };
    })
}

/// Copies tightly packed pixels from `buffer` into mip level 0 of `image`,
/// which must be in `TRANSFER_DST_OPTIMAL`.
pub fn copy_buffer_to_image(
    ctx: &DeviceContext,
    pool: vk::CommandPool,
    buffer: vk::Buffer,
    image: vk::Image,
    width: u32,
    height: u32,
) -> Result<()> {
    submit_once(ctx, pool, |device, cmd| {
        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .mip_level(0)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .image_offset(vk::Offset3D::default())
            .image_extent(vk::Extent3D { width, height, depth: 1 });
        unsafe {
            device.cmd_copy_buffer_to_image(
                cmd,
                buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            )
        };
    })
}

/// Moves every mip level of a colour image from `old` to `new`.
pub fn transition_image_layout(
    ctx: &DeviceContext,
    pool: vk::CommandPool,
    image: vk::Image,
    old: vk::ImageLayout,
    new: vk::ImageLayout,
    mip_levels: u32,
) -> Result<()> {
    let Some(masks) = transition_masks(old, new) else {
        log::error!("unsupported layout transition {old:?} -> {new:?}");
        return Err(vk::Result::ERROR_FORMAT_NOT_SUPPORTED.into());
    };

    submit_once(ctx, pool, |device, cmd| {
        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old)
            .new_layout(new)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(mip_levels)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .src_access_mask(masks.src_access)
            .dst_access_mask(masks.dst_access);
        unsafe {
            device.cmd_pipeline_barrier(
                cmd,
                masks.src_stage,
                masks.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            )
        };
    })
}
