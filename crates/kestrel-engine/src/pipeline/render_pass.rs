use ash::vk;

use crate::error::Result;

pub const COLOR_ATTACHMENT: u32 = 0;
pub const DEPTH_ATTACHMENT: u32 = 1;
/// Only present when the colour attachment is multisampled.
pub const RESOLVE_ATTACHMENT: u32 = 2;

/// Whether the colour attachment needs resolving into the swapchain image.
pub fn needs_resolve(samples: vk::SampleCountFlags) -> bool {
    samples != vk::SampleCountFlags::TYPE_1
}

/// Colour, depth, then (when multisampled) the single-sample resolve target
/// that is presented. Without multisampling the colour attachment is the
/// swapchain image itself.
pub fn attachment_descriptions(
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
) -> Vec<vk::AttachmentDescription> {
    let resolve = needs_resolve(samples);
    let (color_store, color_final) = if resolve {
        (vk::AttachmentStoreOp::DONT_CARE, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
    } else {
        (vk::AttachmentStoreOp::STORE, vk::ImageLayout::PRESENT_SRC_KHR)
    };

    let mut attachments = vec![
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(color_store)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(color_final),
        vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ];
    if resolve {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(color_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::DONT_CARE)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
        );
    }
    attachments
}

/// External → 0 waits for the presentation engine to release the image;
/// 0 → external hands the resolved image back for presentation.
pub fn subpass_dependencies() -> [vk::SubpassDependency; 2] {
    let attachment_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
    let attachment_writes =
        vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(attachment_stages)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(attachment_stages)
            .dst_access_mask(attachment_writes),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
            .dst_access_mask(vk::AccessFlags::MEMORY_READ),
    ]
}

pub fn create_render_pass(
    device: &ash::Device,
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
) -> Result<vk::RenderPass> {
    let attachments = attachment_descriptions(color_format, depth_format, samples);

    let color_ref = [vk::AttachmentReference {
        attachment: COLOR_ATTACHMENT,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let depth_ref = vk::AttachmentReference {
        attachment: DEPTH_ATTACHMENT,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };
    let resolve_ref = [vk::AttachmentReference {
        attachment: RESOLVE_ATTACHMENT,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];

    let mut description = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_ref)
        .depth_stencil_attachment(&depth_ref);
    if needs_resolve(samples) {
        description = description.resolve_attachments(&resolve_ref);
    }
    let subpass = [description];
    let dependencies = subpass_dependencies();

    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpass)
        .dependencies(&dependencies);
    Ok(unsafe { device.create_render_pass(&info, None)? })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachments() -> Vec<vk::AttachmentDescription> {
        attachments_with(vk::SampleCountFlags::TYPE_4)
    }

    fn attachments_with(samples: vk::SampleCountFlags) -> Vec<vk::AttachmentDescription> {
        attachment_descriptions(vk::Format::B8G8R8A8_UNORM, vk::Format::D32_SFLOAT, samples)
    }

    // ── multisampled ──────────────────────────────────────────────────────

    #[test]
    fn only_resolve_target_is_presented() {
        let a = attachments();
        assert_eq!(a[RESOLVE_ATTACHMENT as usize].final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(a[RESOLVE_ATTACHMENT as usize].samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(a[RESOLVE_ATTACHMENT as usize].store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(
            a[COLOR_ATTACHMENT as usize].final_layout,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        );
    }

    #[test]
    fn multisampled_attachments_are_cleared_and_discarded() {
        let a = attachments();
        for i in [COLOR_ATTACHMENT, DEPTH_ATTACHMENT] {
            let d = a[i as usize];
            assert_eq!(d.samples, vk::SampleCountFlags::TYPE_4);
            assert_eq!(d.load_op, vk::AttachmentLoadOp::CLEAR);
            assert_eq!(d.store_op, vk::AttachmentStoreOp::DONT_CARE);
        }
        assert_eq!(a[DEPTH_ATTACHMENT as usize].format, vk::Format::D32_SFLOAT);
    }

    // ── single sample ─────────────────────────────────────────────────────

    #[test]
    fn single_sample_declares_no_resolve_target() {
        let a = attachments_with(vk::SampleCountFlags::TYPE_1);
        assert_eq!(a.len(), 2);
        assert!(!needs_resolve(vk::SampleCountFlags::TYPE_1));
        assert!(a.iter().all(|d| d.samples == vk::SampleCountFlags::TYPE_1));
    }

    #[test]
    fn single_sample_colour_is_stored_and_presented() {
        let a = attachments_with(vk::SampleCountFlags::TYPE_1);
        let colour = a[COLOR_ATTACHMENT as usize];
        assert_eq!(colour.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(colour.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(
            a[DEPTH_ATTACHMENT as usize].final_layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
    }

    #[test]
    fn every_multisampled_count_resolves() {
        use vk::SampleCountFlags as S;
        for samples in [S::TYPE_2, S::TYPE_4, S::TYPE_8, S::TYPE_64] {
            assert!(needs_resolve(samples));
            assert_eq!(attachments_with(samples).len(), 3);
        }
    }

    // ── dependencies ──────────────────────────────────────────────────────

    #[test]
    fn dependencies_bracket_the_subpass() {
        let [enter, leave] = subpass_dependencies();
        assert_eq!(enter.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(enter.dst_subpass, 0);
        assert!(enter.dst_access_mask.contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE));
        assert_eq!(leave.src_subpass, 0);
        assert_eq!(leave.dst_subpass, vk::SUBPASS_EXTERNAL);
    }
}
