use winit::window::Window;

use crate::renderer::Renderer;
use crate::time::FrameTime;

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
pub struct FrameCtx<'a> {
    pub window: &'a Window,
    pub renderer: &'a mut Renderer,
    pub time: FrameTime,
}

impl FrameCtx<'_> {
    /// Framebuffer size in physical pixels.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}
