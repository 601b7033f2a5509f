//! Vulkan instance + device management.
//!
//! This module is responsible for:
//! - loading Vulkan and creating the instance (optionally with validation)
//! - selecting a physical device that can render and present
//! - opening the logical device and fetching its queues

mod context;
mod debug;
mod instance;
mod selection;

pub use context::{DeviceContext, max_usable_sample_count};
pub use debug::VALIDATION_TARGET;
pub use instance::VulkanInstance;
pub use selection::{
    DeviceCandidate, QueueFamilyCaps, QueueFamilyIndices, REQUIRED_DEVICE_EXTENSIONS, Rejection,
    check_suitability, select_device,
};
