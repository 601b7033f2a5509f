use winit::event::WindowEvent;

use crate::renderer::Renderer;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Called once the renderer exists, before the first frame. Load models here.
    fn on_start(&mut self, renderer: &mut Renderer) -> anyhow::Result<()>;

    /// Called for every window event before the runtime handles it.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per frame, before the frame is drawn.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;
}
