use std::collections::HashSet;
use std::ffi::CStr;
use std::fmt;

use ash::vk;

use crate::error::{EngineError, Result};

/// Device extensions every candidate must expose.
pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Queue family indices for graphics and presentation. They may alias.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Picks the first graphics family and the first presenting family,
    /// preferring a single family that does both.
    pub fn find(families: &[QueueFamilyCaps]) -> Option<Self> {
        if let Some(both) = families.iter().position(|f| f.graphics && f.present) {
            let i = both as u32;
            return Some(Self { graphics: i, present: i });
        }

        let graphics = families.iter().position(|f| f.graphics)?;
        let present = families.iter().position(|f| f.present)?;
        Some(Self {
            graphics: graphics as u32,
            present: present as u32,
        })
    }

    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }
}

/// What a single queue family can do for us.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct QueueFamilyCaps {
    pub graphics: bool,
    pub present: bool,
}

/// Plain-data snapshot of a physical device, enough to judge suitability.
#[derive(Debug, Clone, Default)]
pub struct DeviceCandidate {
    pub name: String,
    pub queue_families: Vec<QueueFamilyCaps>,
    pub extensions: Vec<String>,
    pub has_surface_formats: bool,
    pub has_present_modes: bool,
    pub sampler_anisotropy: bool,
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Rejection {
    MissingQueueFamilies,
    MissingExtension(String),
    InadequateSwapchain,
    NoSamplerAnisotropy,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingQueueFamilies => f.write_str("no graphics or no presentation queue"),
            Rejection::MissingExtension(name) => write!(f, "missing extension {name}"),
            Rejection::InadequateSwapchain => f.write_str("no surface formats or present modes"),
            Rejection::NoSamplerAnisotropy => f.write_str("sampler anisotropy unsupported"),
        }
    }
}

/// Checks one candidate against the engine's requirements.
pub fn check_suitability(candidate: &DeviceCandidate) -> std::result::Result<QueueFamilyIndices, Rejection> {
    let indices =
        QueueFamilyIndices::find(&candidate.queue_families).ok_or(Rejection::MissingQueueFamilies)?;

    let available: HashSet<&str> = candidate.extensions.iter().map(String::as_str).collect();
    for required in REQUIRED_DEVICE_EXTENSIONS {
        let name = required.to_string_lossy();
        if !available.contains(name.as_ref()) {
            return Err(Rejection::MissingExtension(name.into_owned()));
        }
    }

    if !(candidate.has_surface_formats && candidate.has_present_modes) {
        return Err(Rejection::InadequateSwapchain);
    }
    if !candidate.sampler_anisotropy {
        return Err(Rejection::NoSamplerAnisotropy);
    }

    Ok(indices)
}

/// Returns the first suitable candidate, in enumeration order.
///
/// Fails with every rejection reason when none qualifies.
pub fn select_device(candidates: &[DeviceCandidate]) -> Result<(usize, QueueFamilyIndices)> {
    let mut reasons = Vec::new();

    for (i, candidate) in candidates.iter().enumerate() {
        match check_suitability(candidate) {
            Ok(indices) => {
                log::info!("selected physical device `{}`", candidate.name);
                return Ok((i, indices));
            }
            Err(why) => {
                log::warn!("skipping physical device `{}`: {why}", candidate.name);
                reasons.push(format!("{}: {why}", candidate.name));
            }
        }
    }

    if reasons.is_empty() {
        return Err(EngineError::NoSuitableDevice(
            "no Vulkan-capable GPU found".to_string(),
        ));
    }
    Err(EngineError::NoSuitableDevice(reasons.join("; ")))
}

/// Queries a physical device into a [`DeviceCandidate`].
pub(crate) fn evaluate(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Result<DeviceCandidate> {
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    let name = properties
        .device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<unnamed>".to_string());

    let families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
    let mut queue_families = Vec::with_capacity(families.len());
    for (index, family) in families.iter().enumerate() {
        let present = unsafe {
            surface_loader.get_physical_device_surface_support(physical_device, index as u32, surface)?
        };
        queue_families.push(QueueFamilyCaps {
            graphics: family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
            present,
        });
    }

    let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device)? }
        .iter()
        .filter_map(|e| e.extension_name_as_c_str().ok())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();

    let formats =
        unsafe { surface_loader.get_physical_device_surface_formats(physical_device, surface)? };
    let modes =
        unsafe { surface_loader.get_physical_device_surface_present_modes(physical_device, surface)? };
    let features = unsafe { instance.get_physical_device_features(physical_device) };

    Ok(DeviceCandidate {
        name,
        queue_families,
        extensions,
        has_surface_formats: !formats.is_empty(),
        has_present_modes: !modes.is_empty(),
        sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(graphics: bool, present: bool) -> QueueFamilyCaps {
        QueueFamilyCaps { graphics, present }
    }

    fn good(name: &str) -> DeviceCandidate {
        DeviceCandidate {
            name: name.to_string(),
            queue_families: vec![family(true, true)],
            extensions: vec!["VK_KHR_swapchain".to_string()],
            has_surface_formats: true,
            has_present_modes: true,
            sampler_anisotropy: true,
        }
    }

    // ── queue families ────────────────────────────────────────────────────

    #[test]
    fn prefers_shared_family() {
        let fams = [family(true, false), family(false, true), family(true, true)];
        let q = QueueFamilyIndices::find(&fams).unwrap();
        assert_eq!(q, QueueFamilyIndices { graphics: 2, present: 2 });
        assert!(q.is_shared());
    }

    #[test]
    fn accepts_split_families() {
        let fams = [family(false, true), family(true, false)];
        let q = QueueFamilyIndices::find(&fams).unwrap();
        assert_eq!(q, QueueFamilyIndices { graphics: 1, present: 0 });
        assert!(!q.is_shared());
    }

    #[test]
    fn no_present_family_is_none() {
        assert!(QueueFamilyIndices::find(&[family(true, false)]).is_none());
    }

    // ── suitability ───────────────────────────────────────────────────────

    #[test]
    fn missing_swapchain_extension_rejected() {
        let mut c = good("a");
        c.extensions = vec!["VK_KHR_maintenance1".to_string()];
        assert_eq!(
            check_suitability(&c),
            Err(Rejection::MissingExtension("VK_KHR_swapchain".to_string()))
        );
    }

    #[test]
    fn empty_surface_support_rejected() {
        let mut c = good("a");
        c.has_present_modes = false;
        assert_eq!(check_suitability(&c), Err(Rejection::InadequateSwapchain));
    }

    // ── selection ─────────────────────────────────────────────────────────

    #[test]
    fn selects_exactly_one_suitable_device() {
        let mut bad = good("integrated");
        bad.queue_families = vec![family(true, false)];
        let list = [bad, good("discrete"), good("second")];

        let (index, q) = select_device(&list).unwrap();
        assert_eq!(index, 1);
        assert_eq!(q.graphics, 0);
    }

    #[test]
    fn selection_fails_without_suitable_device() {
        let mut a = good("a");
        a.extensions.clear();
        let mut b = good("b");
        b.queue_families = vec![family(false, true)];

        let err = select_device(&[a.clone(), b.clone()]).unwrap_err();
        let again = select_device(&[a, b]).unwrap_err();
        assert_eq!(err.to_string(), again.to_string());
        assert!(matches!(err, EngineError::NoSuitableDevice(_)));
        assert!(err.to_string().contains("a: missing extension VK_KHR_swapchain"));
    }

    #[test]
    fn empty_list_fails() {
        assert!(matches!(select_device(&[]), Err(EngineError::NoSuitableDevice(_))));
    }
}
