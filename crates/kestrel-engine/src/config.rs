use std::path::PathBuf;

use ash::vk;
use glam::{Mat4, Vec3};

use crate::descriptors::ViewProjection;

/// Number of frames the CPU may record ahead of the GPU.
pub const MAX_FRAME_DRAWS: usize = 2;

/// Capacity of the per-object dynamic transform buffer.
pub const MAX_OBJECTS: usize = 20;

/// Camera parameters used to build the view-projection uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view, in degrees.
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraConfig {
    /// Builds the view-projection pair for a framebuffer of `width`×`height`.
    ///
    /// Depth maps to [0, 1] and Y is flipped into Vulkan clip space.
    pub fn view_projection(&self, width: u32, height: u32) -> ViewProjection {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let mut projection =
            Mat4::perspective_rh(self.fov_y_degrees.to_radians(), aspect, self.near, self.far);
        projection.y_axis.y *= -1.0;

        ViewProjection {
            projection,
            view: Mat4::look_at_rh(self.eye, self.target, self.up),
        }
    }
}

/// Initialization parameters for the renderer.
///
/// Add fields only for a concrete platform or content requirement.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Reported to the driver in `VkApplicationInfo`.
    pub app_name: String,

    /// Enables `VK_LAYER_KHRONOS_validation` and the debug messenger.
    pub enable_validation: bool,

    /// Frame-in-flight slots. Must not exceed the swapchain image count.
    pub frames_in_flight: usize,

    /// Capacity of the dynamic transform buffer (and of the model registry).
    pub max_objects: usize,

    /// Sets per sampler descriptor pool; further pools are added on demand.
    pub max_textures: u32,

    /// Surface format/color-space pair tried first.
    pub preferred_surface_format: vk::SurfaceFormatKHR,

    /// Present mode tried first; FIFO is the fallback.
    pub preferred_present_mode: vk::PresentModeKHR,

    /// Precompiled SPIR-V for the vertex stage.
    pub vertex_shader: PathBuf,

    /// Precompiled SPIR-V for the fragment stage.
    pub fragment_shader: PathBuf,

    pub clear_color: [f32; 4],

    pub camera: CameraConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "kestrel".to_string(),
            enable_validation: cfg!(debug_assertions),
            frames_in_flight: MAX_FRAME_DRAWS,
            max_objects: MAX_OBJECTS,
            max_textures: MAX_OBJECTS as u32,
            preferred_surface_format: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            preferred_present_mode: vk::PresentModeKHR::MAILBOX,
            vertex_shader: PathBuf::from("shaders/vert.spv"),
            fragment_shader: PathBuf::from("shaders/frag.spv"),
            clear_color: [0.6, 0.65, 0.4, 1.0],
            camera: CameraConfig::default(),
        }
    }
}
