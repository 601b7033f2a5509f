//! Kestrel engine crate.
//!
//! A Vulkan renderer for textured mesh models: device and swapchain setup,
//! an MSAA render pass, per-object dynamic uniforms and a frames-in-flight
//! executor, plus the `winit` runtime that drives it.

pub mod config;
pub mod error;

pub mod device;
pub mod swapchain;
pub mod memory;
pub mod pipeline;
pub mod descriptors;
pub mod texture;
pub mod mesh;
pub mod frame;
pub mod renderer;

pub mod window;
pub mod time;
pub mod core;
pub mod logging;

pub use config::{CameraConfig, MAX_FRAME_DRAWS, MAX_OBJECTS, RendererConfig};
pub use error::{EngineError, ErrorKind, Result};
pub use renderer::Renderer;
