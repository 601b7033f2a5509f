//! Opens a window, loads one OBJ model and spins it about the Y axis.
//!
//! Usage: `kestrel-viewer [model.obj] [shader-dir]`. The shader directory must
//! contain `vert.spv` and `frag.spv` compiled from `kestrel-engine/shaders`.

use std::path::PathBuf;

use anyhow::Context;
use glam::{Mat4, Vec3};
use kestrel_engine::core::{App, AppControl, FrameCtx};
use kestrel_engine::logging::{LoggingConfig, init_logging};
use kestrel_engine::mesh::ModelId;
use kestrel_engine::window::{LogicalSize, Runtime, RuntimeConfig};
use kestrel_engine::{Renderer, RendererConfig};

/// Degrees per second.
const SPIN_RATE: f32 = 10.0;

struct Viewer {
    model_path: PathBuf,
    model: Option<ModelId>,
}

impl App for Viewer {
    fn on_start(&mut self, renderer: &mut Renderer) -> anyhow::Result<()> {
        let id = renderer
            .create_mesh_model(&self.model_path)
            .with_context(|| format!("failed to load {}", self.model_path.display()))?;
        log::info!("loaded {}", self.model_path.display());
        self.model = Some(id);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        if let Some(id) = self.model {
            let angle = (SPIN_RATE * ctx.time.elapsed) % 360.0;
            ctx.renderer
                .update_model(id, Mat4::from_axis_angle(Vec3::Y, angle.to_radians()));
        }
        AppControl::Continue
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let mut args = std::env::args_os().skip(1);
    let model_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("models/model.obj"));
    let shader_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shaders"));

    let renderer = RendererConfig {
        app_name: "kestrel-viewer".to_string(),
        vertex_shader: shader_dir.join("vert.spv"),
        fragment_shader: shader_dir.join("frag.spv"),
        ..Default::default()
    };
    let window = RuntimeConfig {
        title: "Vulkan".to_string(),
        initial_size: LogicalSize::new(800.0, 600.0),
        resizable: true,
    };

    Runtime::run(
        window,
        renderer,
        Viewer {
            model_path,
            model: None,
        },
    )
}
