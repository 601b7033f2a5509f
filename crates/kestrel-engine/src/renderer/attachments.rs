use ash::vk;

use crate::device::DeviceContext;
use crate::error::Result;
use crate::memory::{self, Image, ImageDesc};
use crate::pipeline;

/// An image plus its full-image view.
#[derive(Debug, Default)]
struct Target {
    image: Image,
    view: vk::ImageView,
}

impl Target {
    fn new(ctx: &DeviceContext, desc: ImageDesc, aspect: vk::ImageAspectFlags) -> Result<Self> {
        let mut image = memory::create_image(ctx, &desc)?;
        match memory::create_image_view(ctx.device(), image.handle, desc.format, aspect, 1) {
            Ok(view) => Ok(Self { image, view }),
            Err(e) => {
                unsafe { image.destroy(ctx.device()) };
                Err(e)
            }
        }
    }

    unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            if self.view != vk::ImageView::null() {
                device.destroy_image_view(self.view, None);
                self.view = vk::ImageView::null();
            }
            self.image.destroy(device);
        }
    }
}

/// Depth target and, when multisampling, the colour target that resolves
/// into the swapchain image. Sized to the swapchain extent.
#[derive(Debug, Default)]
pub struct RenderTargets {
    color: Option<Target>,
    depth: Target,
}

impl RenderTargets {
    pub fn new(
        ctx: &DeviceContext,
        extent: vk::Extent2D,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> Result<Self> {
        let samples = ctx.msaa_samples();
        let base = ImageDesc {
            width: extent.width,
            height: extent.height,
            mip_levels: 1,
            samples,
            format: color_format,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::TRANSIENT_ATTACHMENT | vk::ImageUsageFlags::COLOR_ATTACHMENT,
            memory: vk::MemoryPropertyFlags::DEVICE_LOCAL,
        };

        let mut color = if pipeline::needs_resolve(samples) {
            Some(Target::new(ctx, base, vk::ImageAspectFlags::COLOR)?)
        } else {
            None
        };
        let depth = Target::new(
            ctx,
            ImageDesc {
                format: depth_format,
                usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                ..base
            },
            vk::ImageAspectFlags::DEPTH,
        );
        match depth {
            Ok(depth) => Ok(Self { color, depth }),
            Err(e) => {
                if let Some(color) = color.as_mut() {
                    unsafe { color.destroy(ctx.device()) };
                }
                Err(e)
            }
        }
    }

    /// Framebuffer attachments in render-pass order for one swapchain view.
    pub fn attachments(&self, swapchain_view: vk::ImageView) -> Vec<vk::ImageView> {
        framebuffer_views(
            self.color.as_ref().map(|c| c.view),
            self.depth.view,
            swapchain_view,
        )
    }

    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            self.depth.destroy(device);
            if let Some(mut color) = self.color.take() {
                color.destroy(device);
            }
        }
    }
}

/// `[msaa colour, depth, resolve]` when multisampling, otherwise the
/// swapchain view is the colour attachment: `[colour, depth]`.
fn framebuffer_views(
    msaa_color: Option<vk::ImageView>,
    depth: vk::ImageView,
    swapchain_view: vk::ImageView,
) -> Vec<vk::ImageView> {
    match msaa_color {
        Some(color) => vec![color, depth, swapchain_view],
        None => vec![swapchain_view, depth],
    }
}

/// One framebuffer per swapchain view.
pub fn create_framebuffers(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    targets: &RenderTargets,
    views: &[vk::ImageView],
    extent: vk::Extent2D,
) -> Result<Vec<vk::Framebuffer>> {
    let mut framebuffers = Vec::with_capacity(views.len());
    for &view in views {
        let attachments = targets.attachments(view);
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        match unsafe { device.create_framebuffer(&info, None) } {
            Ok(fb) => framebuffers.push(fb),
            Err(e) => {
                unsafe { destroy_framebuffers(device, &mut framebuffers) };
                return Err(e.into());
            }
        }
    }
    Ok(framebuffers)
}

pub(crate) unsafe fn destroy_framebuffers(device: &ash::Device, framebuffers: &mut Vec<vk::Framebuffer>) {
    for fb in framebuffers.drain(..) {
        unsafe { device.destroy_framebuffer(fb, None) };
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;
    use crate::pipeline::{COLOR_ATTACHMENT, DEPTH_ATTACHMENT, RESOLVE_ATTACHMENT};

    fn view(raw: u64) -> vk::ImageView {
        vk::ImageView::from_raw(raw)
    }

    #[test]
    fn multisampled_framebuffer_resolves_into_swapchain_view() {
        let v = framebuffer_views(Some(view(1)), view(2), view(3));
        assert_eq!(v[COLOR_ATTACHMENT as usize], view(1));
        assert_eq!(v[DEPTH_ATTACHMENT as usize], view(2));
        assert_eq!(v[RESOLVE_ATTACHMENT as usize], view(3));
    }

    #[test]
    fn single_sample_framebuffer_draws_into_swapchain_view() {
        let v = framebuffer_views(None, view(2), view(3));
        assert_eq!(v, [view(3), view(2)]);
    }

    #[test]
    fn framebuffer_matches_render_pass_attachment_count() {
        use vk::SampleCountFlags as S;
        for samples in [S::TYPE_1, S::TYPE_4] {
            let colour = pipeline::needs_resolve(samples).then(|| view(1));
            let declared =
                pipeline::attachment_descriptions(vk::Format::B8G8R8A8_UNORM, vk::Format::D32_SFLOAT, samples);
            assert_eq!(framebuffer_views(colour, view(2), view(3)).len(), declared.len());
        }
    }
}
