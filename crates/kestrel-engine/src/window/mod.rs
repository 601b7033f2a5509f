//! Window + runtime loop.
//!
//! Owns the `winit` event loop and window, and wires them to the renderer.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
pub use winit::dpi::LogicalSize;
