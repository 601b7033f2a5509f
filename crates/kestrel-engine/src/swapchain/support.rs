use ash::vk;

use crate::error::{EngineError, Result};

/// What a surface supports on the selected physical device.
#[derive(Debug, Clone, Default)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn query(
        loader: &ash::khr::surface::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        let support = unsafe {
            Self {
                capabilities: loader
                    .get_physical_device_surface_capabilities(physical_device, surface)?,
                formats: loader.get_physical_device_surface_formats(physical_device, surface)?,
                present_modes: loader
                    .get_physical_device_surface_present_modes(physical_device, surface)?,
            }
        };
        if support.formats.is_empty() || support.present_modes.is_empty() {
            return Err(EngineError::UnsupportedSurface);
        }
        Ok(support)
    }
}

/// Picks `preferred` when the surface offers it, otherwise the first format.
///
/// A single `UNDEFINED` entry means the surface accepts anything.
pub fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    preferred: vk::SurfaceFormatKHR,
) -> Option<vk::SurfaceFormatKHR> {
    if let [only] = formats {
        if only.format == vk::Format::UNDEFINED {
            return Some(preferred);
        }
    }
    formats
        .iter()
        .copied()
        .find(|f| f.format == preferred.format && f.color_space == preferred.color_space)
        .or_else(|| formats.first().copied())
}

/// `preferred` when available, else FIFO, which every implementation supports.
pub fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    preferred: vk::PresentModeKHR,
) -> vk::PresentModeKHR {
    if modes.contains(&preferred) {
        preferred
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's fixed extent, or the framebuffer size clamped to its bounds
/// when the surface leaves the choice to us.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, framebuffer: (u32, u32)) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: framebuffer
            .0
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: framebuffer
            .1
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum when there is one.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sf(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    fn preferred() -> vk::SurfaceFormatKHR {
        sf(vk::Format::B8G8R8A8_UNORM)
    }

    // ── surface format ────────────────────────────────────────────────────

    #[test]
    fn undefined_means_anything_goes() {
        let chosen = choose_surface_format(&[sf(vk::Format::UNDEFINED)], preferred()).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn preferred_format_wins_when_listed() {
        let formats = [sf(vk::Format::R8G8B8A8_SRGB), preferred()];
        assert_eq!(
            choose_surface_format(&formats, preferred()).unwrap().format,
            vk::Format::B8G8R8A8_UNORM
        );
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [sf(vk::Format::R8G8B8A8_SRGB), sf(vk::Format::R8G8B8A8_UNORM)];
        assert_eq!(
            choose_surface_format(&formats, preferred()).unwrap().format,
            vk::Format::R8G8B8A8_SRGB
        );
        assert!(choose_surface_format(&[], preferred()).is_none());
    }

    // ── present mode ──────────────────────────────────────────────────────

    #[test]
    fn mailbox_then_fifo() {
        use vk::PresentModeKHR as P;
        assert_eq!(choose_present_mode(&[P::FIFO, P::MAILBOX], P::MAILBOX), P::MAILBOX);
        assert_eq!(choose_present_mode(&[P::IMMEDIATE, P::FIFO], P::MAILBOX), P::FIFO);
    }

    // ── extent and image count ────────────────────────────────────────────

    #[test]
    fn fixed_extent_is_used_verbatim() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 640, height: 480 },
            ..Default::default()
        };
        assert_eq!(choose_extent(&caps, (1920, 1080)), vk::Extent2D { width: 640, height: 480 });
    }

    #[test]
    fn free_extent_is_clamped() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 1024, height: 768 },
            ..Default::default()
        };
        assert_eq!(choose_extent(&caps, (1920, 0)), vk::Extent2D { width: 1024, height: 1 });
    }

    #[test]
    fn image_count_respects_maximum() {
        let unbounded = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&unbounded), 3);

        let bounded = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 2,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&bounded), 2);
    }
}
