use std::path::Path;

use ash::vk;

use crate::descriptors::ModelTransform;
use crate::error::Result;
use crate::mesh::Vertex;

use super::shader::load_shader_module;

/// Push-constant range carrying one [`ModelTransform`] to the vertex stage.
pub fn push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::VERTEX,
        offset: 0,
        size: size_of::<ModelTransform>() as u32,
    }
}

/// Shader and layout inputs for [`GraphicsPipeline::new`].
pub struct PipelineDesc<'a> {
    pub render_pass: vk::RenderPass,
    pub samples: vk::SampleCountFlags,
    pub set_layouts: &'a [vk::DescriptorSetLayout],
    pub vertex_shader: &'a Path,
    pub fragment_shader: &'a Path,
}

/// The engine's single opaque, depth-tested, textured pipeline.
///
/// Viewport and scissor are dynamic, so a resize only touches the swapchain
/// and framebuffers.
#[derive(Default)]
pub struct GraphicsPipeline {
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl GraphicsPipeline {
    pub fn new(device: &ash::Device, desc: &PipelineDesc<'_>) -> Result<Self> {
        let vert = load_shader_module(device, desc.vertex_shader)?;
        let frag = match load_shader_module(device, desc.fragment_shader) {
            Ok(m) => m,
            Err(e) => {
                unsafe { device.destroy_shader_module(vert, None) };
                return Err(e);
            }
        };

        let result = Self::build(device, desc, vert, frag);

        // Modules are only needed while the pipeline is compiled.
        unsafe {
            device.destroy_shader_module(vert, None);
            device.destroy_shader_module(frag, None);
        }
        result
    }

    fn build(
        device: &ash::Device,
        desc: &PipelineDesc<'_>,
        vert: vk::ShaderModule,
        frag: vk::ShaderModule,
    ) -> Result<Self> {
        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vert)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(frag)
                .name(c"main"),
        ];

        let bindings = [Vertex::binding_description()];
        let attributes = Vertex::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(desc.samples);

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)];
        let blend = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let depth = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let push_constants = [push_constant_range()];
        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(desc.set_layouts)
            .push_constant_ranges(&push_constants);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None)? };

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport)
            .dynamic_state(&dynamic)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .color_blend_state(&blend)
            .depth_stencil_state(&depth)
            .layout(layout)
            .render_pass(desc.render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
        };
        match pipelines {
            Ok(p) => Ok(Self {
                layout,
                pipeline: p[0],
            }),
            Err((_, e)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                Err(e.into())
            }
        }
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                device.destroy_pipeline(self.pipeline, None);
                self.pipeline = vk::Pipeline::null();
            }
            if self.layout != vk::PipelineLayout::null() {
                device.destroy_pipeline_layout(self.layout, None);
                self.layout = vk::PipelineLayout::null();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_constant_holds_one_matrix() {
        let r = push_constant_range();
        assert_eq!(r.size, 64);
        assert_eq!(r.offset, 0);
        assert_eq!(r.stage_flags, vk::ShaderStageFlags::VERTEX);
    }
}
