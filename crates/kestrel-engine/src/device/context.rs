use std::collections::BTreeSet;

use ash::vk;

use crate::error::{EngineError, Result};

use super::instance::VulkanInstance;
use super::selection::{self, DeviceCandidate, QueueFamilyIndices, REQUIRED_DEVICE_EXTENSIONS};

/// Physical + logical device, their queues, and the capabilities later stages read.
///
/// Created once during init, immutable afterwards, destroyed after every other
/// device-owned object.
pub struct DeviceContext {
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,

    queue_families: QueueFamilyIndices,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,

    /// Highest sample count usable for both colour and depth attachments.
    msaa_samples: vk::SampleCountFlags,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    limits: vk::PhysicalDeviceLimits,
}

impl DeviceContext {
    /// Selects a physical device able to present to `surface` and opens it.
    pub fn new(vk_instance: &VulkanInstance, surface: vk::SurfaceKHR) -> Result<Self> {
        let instance = vk_instance.instance();
        let physical_devices = unsafe { instance.enumerate_physical_devices()? };

        let mut candidates = Vec::with_capacity(physical_devices.len());
        for &pd in &physical_devices {
            match selection::evaluate(instance, vk_instance.surface_loader(), surface, pd) {
                Ok(c) => candidates.push(c),
                Err(e) => {
                    log::warn!("failed to query physical device: {e}");
                    candidates.push(DeviceCandidate {
                        name: "<unqueryable>".to_string(),
                        ..Default::default()
                    });
                }
            }
        }

        let (index, queue_families) = selection::select_device(&candidates)?;
        let physical_device = physical_devices[index];

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let msaa_samples = max_usable_sample_count(&properties.limits);

        let device = create_logical_device(instance, physical_device, queue_families)?;
        let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };

        log::info!(
            "logical device ready (graphics family {}, present family {}, msaa {:?})",
            queue_families.graphics,
            queue_families.present,
            msaa_samples
        );

        Ok(Self {
            instance: instance.clone(),
            physical_device,
            device,
            queue_families,
            graphics_queue,
            present_queue,
            msaa_samples,
            memory_properties,
            limits: properties.limits,
        })
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn msaa_samples(&self) -> vk::SampleCountFlags {
        self.msaa_samples
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.limits
    }

    pub fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        }
    }

    /// Blocks until every queue is idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    pub(crate) unsafe fn destroy(&mut self) {
        unsafe { self.device.destroy_device(None) };
    }
}

fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    families: QueueFamilyIndices,
) -> Result<ash::Device> {
    // Graphics and presentation may share one family; request each family once.
    let unique: BTreeSet<u32> = [families.graphics, families.present].into_iter().collect();
    let priorities = [1.0_f32];
    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&priorities)
        })
        .collect();

    let extensions: Vec<*const std::ffi::c_char> =
        REQUIRED_DEVICE_EXTENSIONS.iter().map(|e| e.as_ptr()).collect();
    let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extensions)
        .enabled_features(&features);

    unsafe { instance.create_device(physical_device, &create_info, None) }.map_err(EngineError::from)
}

/// Highest sample count supported by both colour and depth framebuffers.
pub fn max_usable_sample_count(limits: &vk::PhysicalDeviceLimits) -> vk::SampleCountFlags {
    let counts = limits.framebuffer_color_sample_counts & limits.framebuffer_depth_sample_counts;
    [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ]
    .into_iter()
    .find(|&c| counts.contains(c))
    .unwrap_or(vk::SampleCountFlags::TYPE_1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(color: vk::SampleCountFlags, depth: vk::SampleCountFlags) -> vk::PhysicalDeviceLimits {
        vk::PhysicalDeviceLimits {
            framebuffer_color_sample_counts: color,
            framebuffer_depth_sample_counts: depth,
            ..Default::default()
        }
    }

    #[test]
    fn sample_count_is_intersection_maximum() {
        use vk::SampleCountFlags as S;
        let l = limits(
            S::TYPE_1 | S::TYPE_2 | S::TYPE_4 | S::TYPE_8,
            S::TYPE_1 | S::TYPE_2 | S::TYPE_4,
        );
        assert_eq!(max_usable_sample_count(&l), S::TYPE_4);
    }

    #[test]
    fn sample_count_falls_back_to_one() {
        use vk::SampleCountFlags as S;
        assert_eq!(max_usable_sample_count(&limits(S::TYPE_1, S::TYPE_1)), S::TYPE_1);
        assert_eq!(max_usable_sample_count(&limits(S::empty(), S::empty())), S::TYPE_1);
    }
}
