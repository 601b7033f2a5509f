//! Swapchain creation and the surface-capability choices behind it.

mod support;
#[allow(clippy::module_inception)]
mod swapchain;

pub use support::{
    SwapchainSupport, choose_extent, choose_image_count, choose_present_mode, choose_surface_format,
};
pub use swapchain::Swapchain;
