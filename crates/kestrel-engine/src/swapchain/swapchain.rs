use ash::vk;

use crate::config::RendererConfig;
use crate::device::{DeviceContext, VulkanInstance};
use crate::error::{EngineError, Result};
use crate::memory;

use super::support::{
    SwapchainSupport, choose_extent, choose_image_count, choose_present_mode, choose_surface_format,
};

/// Swapchain handle together with its images and one colour view per image.
pub struct Swapchain {
    loader: ash::khr::swapchain::Device,
    handle: vk::SwapchainKHR,
    format: vk::Format,
    extent: vk::Extent2D,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
}

impl Swapchain {
    /// Builds a swapchain for `surface`. Pass the previous handle as `old`
    /// when recreating so the driver can recycle its resources.
    pub fn new(
        instance: &VulkanInstance,
        ctx: &DeviceContext,
        surface: vk::SurfaceKHR,
        framebuffer: (u32, u32),
        config: &RendererConfig,
        old: vk::SwapchainKHR,
    ) -> Result<Self> {
        let support =
            SwapchainSupport::query(instance.surface_loader(), ctx.physical_device(), surface)?;
        let surface_format =
            choose_surface_format(&support.formats, config.preferred_surface_format)
                .ok_or(EngineError::UnsupportedSurface)?;
        let present_mode =
            choose_present_mode(&support.present_modes, config.preferred_present_mode);
        let extent = choose_extent(&support.capabilities, framebuffer);
        let image_count = choose_image_count(&support.capabilities);

        let families = ctx.queue_families();
        let family_indices = [families.graphics, families.present];
        let mut info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old);
        info = if families.is_shared() {
            info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            info.image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        };

        let loader = ash::khr::swapchain::Device::new(ctx.instance(), ctx.device());
        let handle = unsafe { loader.create_swapchain(&info, None)? };
        let images = unsafe { loader.get_swapchain_images(handle)? };

        let mut views = Vec::with_capacity(images.len());
        for &image in &images {
            match memory::create_image_view(
                ctx.device(),
                image,
                surface_format.format,
                vk::ImageAspectFlags::COLOR,
                1,
            ) {
                Ok(view) => views.push(view),
                Err(e) => {
                    unsafe {
                        for &v in &views {
                            ctx.device().destroy_image_view(v, None);
                        }
                        loader.destroy_swapchain(handle, None);
                    }
                    return Err(e);
                }
            }
        }

        log::info!(
            "swapchain {}x{} with {} images ({:?}, {:?})",
            extent.width,
            extent.height,
            images.len(),
            surface_format.format,
            present_mode
        );

        Ok(Self {
            loader,
            handle,
            format: surface_format.format,
            extent,
            images,
            views,
        })
    }

    /// Returns the acquired image index and whether the swapchain is suboptimal.
    pub fn acquire_next_image(&self, signal: vk::Semaphore) -> ash::prelude::VkResult<(u32, bool)> {
        unsafe {
            self.loader
                .acquire_next_image(self.handle, u64::MAX, signal, vk::Fence::null())
        }
    }

    /// Queues `image_index` for presentation once `wait` is signalled.
    /// `Ok(true)` means suboptimal.
    pub fn present(
        &self,
        queue: vk::Queue,
        wait: vk::Semaphore,
        image_index: u32,
    ) -> ash::prelude::VkResult<bool> {
        let waits = [wait];
        let swapchains = [self.handle];
        let indices = [image_index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&waits)
            .swapchains(&swapchains)
            .image_indices(&indices);
        unsafe { self.loader.queue_present(queue, &info) }
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn views(&self) -> &[vk::ImageView] {
        &self.views
    }

    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            for view in self.views.drain(..) {
                device.destroy_image_view(view, None);
            }
            if self.handle != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(self.handle, None);
                self.handle = vk::SwapchainKHR::null();
            }
        }
        self.images.clear();
    }
}
