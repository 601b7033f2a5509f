use std::collections::HashSet;
use std::ffi::{CStr, CString, c_char};

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::config::RendererConfig;
use crate::error::{EngineError, Result};

use super::debug::{self, DebugMessenger};

/// Owns the Vulkan loader, instance, optional debug messenger and the surface
/// extension loader. Destroyed last, after the logical device.
pub struct VulkanInstance {
    entry: ash::Entry,
    instance: ash::Instance,
    surface_loader: ash::khr::surface::Instance,
    debug: Option<DebugMessenger>,
}

impl VulkanInstance {
    /// Loads Vulkan and creates an instance able to present to `display`.
    pub fn new(config: &RendererConfig, display: RawDisplayHandle) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let mut extensions: Vec<*const c_char> =
            ash_window::enumerate_required_extensions(display)?.to_vec();
        if config.enable_validation {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let available = unsafe { entry.enumerate_instance_extension_properties(None)? };
        let available_names: Vec<&CStr> = available
            .iter()
            .filter_map(|p| p.extension_name_as_c_str().ok())
            .collect();
        let required: Vec<&CStr> = extensions
            .iter()
            .map(|&p| unsafe { CStr::from_ptr(p) })
            .collect();
        if let Some(missing) = first_missing(&required, &available_names) {
            return Err(EngineError::MissingExtension {
                kind: "instance",
                name: missing.to_string_lossy().into_owned(),
            });
        }

        let layers: Vec<*const c_char> = if config.enable_validation {
            let props = unsafe { entry.enumerate_instance_layer_properties()? };
            let found = props
                .iter()
                .filter_map(|l| l.layer_name_as_c_str().ok())
                .any(|name| name == debug::VALIDATION_LAYER);
            if !found {
                return Err(EngineError::ValidationUnavailable);
            }
            vec![debug::VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        let app_name = CString::new(config.app_name.as_str()).unwrap_or_else(|_| c"kestrel".into());
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"kestrel")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_1);

        let mut debug_info = debug::messenger_info();
        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions);
        if config.enable_validation {
            create_info = create_info.push_next(&mut debug_info);
        }

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        let debug = if config.enable_validation {
            match DebugMessenger::new(&entry, &instance) {
                Ok(m) => Some(m),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        log::debug!(
            "vulkan instance created ({} extensions, validation {})",
            extensions.len(),
            if config.enable_validation { "on" } else { "off" }
        );

        Ok(Self {
            entry,
            instance,
            surface_loader,
            debug,
        })
    }

    /// Creates a presentation surface for a native window.
    pub fn create_surface(
        &self,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<vk::SurfaceKHR> {
        let surface =
            unsafe { ash_window::create_surface(&self.entry, &self.instance, display, window, None)? };
        Ok(surface)
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    pub(crate) unsafe fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        if surface != vk::SurfaceKHR::null() {
            unsafe { self.surface_loader.destroy_surface(surface, None) };
        }
    }

    /// Destroys the messenger and the instance. Every child object must be gone.
    pub(crate) unsafe fn destroy(&mut self) {
        if let Some(mut debug) = self.debug.take() {
            unsafe { debug.destroy() };
        }
        unsafe { self.instance.destroy_instance(None) };
    }
}

/// Returns the first entry of `required` missing from `available`.
pub(crate) fn first_missing<'a>(required: &[&'a CStr], available: &[&CStr]) -> Option<&'a CStr> {
    let available: HashSet<&CStr> = available.iter().copied().collect();
    required.iter().copied().find(|r| !available.contains(r))
}
