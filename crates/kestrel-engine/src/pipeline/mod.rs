//! Render pass, shader loading and the graphics pipeline.

mod graphics;
mod render_pass;
mod shader;

pub use graphics::{GraphicsPipeline, PipelineDesc, push_constant_range};
pub use render_pass::{
    COLOR_ATTACHMENT, DEPTH_ATTACHMENT, RESOLVE_ATTACHMENT, attachment_descriptions,
    create_render_pass, needs_resolve, subpass_dependencies,
};
pub use shader::load_shader_module;
