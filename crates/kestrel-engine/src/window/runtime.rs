use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::RendererConfig;
use crate::core::{App, AppControl, FrameCtx};
use crate::error::ErrorKind;
use crate::frame::FrameOutcome;
use crate::renderer::Renderer;
use crate::time::FrameClock;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "kestrel".to_string(),
            initial_size: LogicalSize::new(1366.0, 768.0),
            resizable: true,
        }
    }
}

/// Entry point for the windowed render loop.
pub struct Runtime;

impl Runtime {
    /// Opens one window, initialises a [`Renderer`] for it and drives `app`
    /// until the window closes or `app` asks to exit.
    pub fn run<A>(window: RuntimeConfig, renderer: RendererConfig, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(window, renderer, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct AppState<A: App> {
    window_config: RuntimeConfig,
    renderer_config: RendererConfig,
    app: A,

    // Declared before `window` so the renderer is dropped first.
    renderer: Option<Renderer>,
    window: Option<Window>,
    clock: FrameClock,

    failure: Option<anyhow::Error>,
    exit_requested: bool,
}

impl<A: App> AppState<A> {
    fn new(window_config: RuntimeConfig, renderer_config: RendererConfig, app: A) -> Self {
        Self {
            window_config,
            renderer_config,
            app,
            renderer: None,
            window: None,
            clock: FrameClock::default(),
            failure: None,
            exit_requested: false,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.window_config.title.clone())
            .with_inner_size(self.window_config.initial_size)
            .with_resizable(self.window_config.resizable);
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let size = window.inner_size();
        let mut renderer = Renderer::init(
            &window,
            (size.width, size.height),
            self.renderer_config.clone(),
        )
        .context("failed to initialise renderer")?;

        self.app
            .on_start(&mut renderer)
            .context("application start-up failed")?;

        window.request_redraw();
        self.clock.reset();
        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.failure.get_or_insert(error);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.clean();
        }
        event_loop.exit();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(size.width, size.height);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_mut()) else {
            return;
        };

        let time = self.clock.tick();
        let control = {
            let mut ctx = FrameCtx {
                window,
                renderer: &mut *renderer,
                time,
            };
            self.app.on_frame(&mut ctx)
        };
        if control == AppControl::Exit {
            self.shutdown(event_loop);
            return;
        }

        window.pre_present_notify();
        match renderer.draw() {
            Ok(FrameOutcome::SwapchainRecreated) => log::debug!("frame skipped for swapchain rebuild"),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::TransientPresentation => {
                log::warn!("presentation interrupted: {e}");
            }
            Err(e) => {
                let error = anyhow::Error::new(e).context("frame rendering failed");
                self.fail(event_loop, error);
            }
        }
    }
}

impl<A: App> ApplicationHandler for AppState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.exit_requested {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Continuous redraw: the scene animates every frame.
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(Window::id) != Some(window_id) {
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.shutdown(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(size) => self.resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(Window::inner_size) {
                    self.resize(size);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
