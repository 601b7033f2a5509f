use std::path::Path;

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::config::{CameraConfig, RendererConfig};
use crate::descriptors::{ModelTransform, UniformSets, ViewProjection};
use crate::device::{DeviceContext, VulkanInstance};
use crate::error::Result;
use crate::frame::{self, AcquireOutcome, FrameBackend, FrameSlot, PresentOutcome};
use crate::memory;
use crate::mesh::{DrawItem, Mesh, MeshData, MeshId};
use crate::pipeline::{self, GraphicsPipeline, PipelineDesc};
use crate::swapchain::Swapchain;
use crate::texture::{DecodedImage, ImageDecoder, TextureManager};

use super::attachments::{self, RenderTargets};

/// Every Vulkan object the renderer owns, in creation order.
///
/// Implements [`FrameBackend`] for the frame executor. Torn down in reverse by
/// [`RenderCore::destroy`].
pub struct RenderCore {
    instance: VulkanInstance,
    surface: vk::SurfaceKHR,
    ctx: DeviceContext,
    swapchain: Swapchain,
    render_pass: vk::RenderPass,
    depth_format: vk::Format,
    targets: RenderTargets,
    framebuffers: Vec<vk::Framebuffer>,
    command_pool: vk::CommandPool,
    uniforms: UniformSets,
    textures: TextureManager,
    pipeline: GraphicsPipeline,
    slots: Vec<FrameSlot>,
    meshes: Vec<Mesh>,

    config: RendererConfig,
    camera: ViewProjection,
    framebuffer_size: (u32, u32),
}

/// Components built after the swapchain. Every field starts null, so a
/// failed build can release whatever was created.
#[derive(Default)]
struct Built {
    depth_format: vk::Format,
    render_pass: vk::RenderPass,
    targets: RenderTargets,
    framebuffers: Vec<vk::Framebuffer>,
    command_pool: vk::CommandPool,
    uniforms: UniformSets,
    textures: TextureManager,
    pipeline: GraphicsPipeline,
    slots: Vec<FrameSlot>,
}

impl RenderCore {
    pub fn new(
        display: RawDisplayHandle,
        window: RawWindowHandle,
        framebuffer_size: (u32, u32),
        config: RendererConfig,
        decoder: Box<dyn ImageDecoder>,
    ) -> Result<Self> {
        let mut instance = VulkanInstance::new(&config, display)?;
        let surface = match instance.create_surface(display, window) {
            Ok(s) => s,
            Err(e) => {
                unsafe { instance.destroy() };
                return Err(e);
            }
        };
        let mut ctx = match DeviceContext::new(&instance, surface) {
            Ok(c) => c,
            Err(e) => {
                unsafe {
                    instance.destroy_surface(surface);
                    instance.destroy();
                }
                return Err(e);
            }
        };

        let mut swapchain = match Swapchain::new(
            &instance,
            &ctx,
            surface,
            framebuffer_size,
            &config,
            vk::SwapchainKHR::null(),
        ) {
            Ok(s) => s,
            Err(e) => {
                unsafe {
                    ctx.destroy();
                    instance.destroy_surface(surface);
                    instance.destroy();
                }
                return Err(e);
            }
        };

        let mut built = Built::default();
        if let Err(e) = built.build(&ctx, &swapchain, &config, decoder) {
            unsafe {
                built.release(ctx.device());
                swapchain.destroy(ctx.device());
                ctx.destroy();
                instance.destroy_surface(surface);
                instance.destroy();
            }
            return Err(e);
        }

        let extent = swapchain.extent();
        let camera = config.camera.view_projection(extent.width, extent.height);
        Ok(Self {
            instance,
            surface,
            ctx,
            swapchain,
            render_pass: built.render_pass,
            depth_format: built.depth_format,
            targets: built.targets,
            framebuffers: built.framebuffers,
            command_pool: built.command_pool,
            uniforms: built.uniforms,
            textures: built.textures,
            pipeline: built.pipeline,
            slots: built.slots,
            meshes: Vec::new(),
            config,
            camera,
            framebuffer_size,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    pub fn framebuffer_size(&self) -> (u32, u32) {
        self.framebuffer_size
    }

    pub fn set_framebuffer_size(&mut self, size: (u32, u32)) {
        self.framebuffer_size = size;
    }

    pub fn set_camera(&mut self, camera: CameraConfig) {
        self.config.camera = camera;
        let extent = self.swapchain.extent();
        self.camera = camera.view_projection(extent.width, extent.height);
    }

    pub fn load_texture(&mut self, path: &Path) -> Result<usize> {
        self.textures.create_texture(&self.ctx, self.command_pool, path)
    }

    pub fn load_texture_pixels(&mut self, decoded: &DecodedImage) -> Result<usize> {
        self.textures.create_from_pixels(&self.ctx, self.command_pool, decoded)
    }

    pub fn upload_mesh(&mut self, data: &MeshData, texture_id: usize) -> Result<MeshId> {
        let mesh = Mesh::new(&self.ctx, self.command_pool, data, texture_id)?;
        self.meshes.push(mesh);
        Ok(MeshId(self.meshes.len() - 1))
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.ctx.wait_idle()
    }

    /// Releases everything in reverse creation order.
    pub(crate) unsafe fn destroy(&mut self) {
        let device = self.ctx.device().clone();
        if let Err(e) = self.ctx.wait_idle() {
            log::warn!("device_wait_idle failed during teardown: {e}");
        }
        unsafe {
            for mut mesh in self.meshes.drain(..) {
                mesh.destroy(&device);
            }
            frame::destroy_slots(&device, &mut self.slots);
            self.pipeline.destroy(&device);
            self.textures.destroy(&device);
            self.uniforms.destroy(&device);
            device.destroy_command_pool(self.command_pool, None);
            attachments::destroy_framebuffers(&device, &mut self.framebuffers);
            self.targets.destroy(&device);
            device.destroy_render_pass(self.render_pass, None);
            self.swapchain.destroy(&device);
            self.ctx.destroy();
            self.instance.destroy_surface(self.surface);
            self.instance.destroy();
        }
        log::info!("renderer resources released");
    }
}

impl Built {
    /// Render pass → attachments → framebuffers → command pool → descriptors
    /// → textures → pipeline → frame slots.
    fn build(
        &mut self,
        ctx: &DeviceContext,
        swapchain: &Swapchain,
        config: &RendererConfig,
        decoder: Box<dyn ImageDecoder>,
    ) -> Result<()> {
        let device = ctx.device();
        self.depth_format = memory::depth_format(ctx)?;

        self.render_pass = pipeline::create_render_pass(
            device,
            swapchain.format(),
            self.depth_format,
            ctx.msaa_samples(),
        )?;

        self.targets =
            RenderTargets::new(ctx, swapchain.extent(), swapchain.format(), self.depth_format)?;
        self.framebuffers = attachments::create_framebuffers(
            device,
            self.render_pass,
            &self.targets,
            swapchain.views(),
            swapchain.extent(),
        )?;

        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(ctx.queue_families().graphics);
        self.command_pool = unsafe { device.create_command_pool(&pool_info, None)? };

        self.uniforms = UniformSets::new(ctx, swapchain.image_count(), config.max_objects)?;
        self.textures = TextureManager::new(ctx, self.command_pool, config.max_textures, decoder)?;

        self.pipeline = build_pipeline(
            ctx,
            self.render_pass,
            [self.uniforms.layout(), self.textures.set_layout()],
            config,
        )?;

        self.slots = frame::create_slots(device, self.command_pool, config.frames_in_flight)?;
        Ok(())
    }

    unsafe fn release(&mut self, device: &ash::Device) {
        unsafe {
            frame::destroy_slots(device, &mut self.slots);
            self.pipeline.destroy(device);
            self.textures.destroy(device);
            self.uniforms.destroy(device);
            if self.command_pool != vk::CommandPool::null() {
                device.destroy_command_pool(self.command_pool, None);
            }
            attachments::destroy_framebuffers(device, &mut self.framebuffers);
            self.targets.destroy(device);
            if self.render_pass != vk::RenderPass::null() {
                device.destroy_render_pass(self.render_pass, None);
            }
        }
    }
}

fn build_pipeline(
    ctx: &DeviceContext,
    render_pass: vk::RenderPass,
    set_layouts: [vk::DescriptorSetLayout; 2],
    config: &RendererConfig,
) -> Result<GraphicsPipeline> {
    GraphicsPipeline::new(
        ctx.device(),
        &PipelineDesc {
            render_pass,
            samples: ctx.msaa_samples(),
            set_layouts: &set_layouts,
            vertex_shader: &config.vertex_shader,
            fragment_shader: &config.fragment_shader,
        },
    )
}

/// What a swapchain rebuild has to recreate besides the swapchain itself.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct RecreationPlan {
    /// The render pass (and the pipeline built against it) bakes in the
    /// colour format.
    render_pass: bool,
    /// Uniform buffers and sets are per swapchain image.
    uniforms: bool,
}

fn recreation_plan(
    old_format: vk::Format,
    new_format: vk::Format,
    old_images: usize,
    new_images: usize,
) -> RecreationPlan {
    RecreationPlan {
        render_pass: old_format != new_format,
        uniforms: old_images != new_images,
    }
}

impl FrameBackend for RenderCore {
    fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        let fence = [self.slots[slot].in_flight];
        unsafe { self.ctx.device().wait_for_fences(&fence, true, u64::MAX)? };
        Ok(())
    }

    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
        match self.swapchain.acquire_next_image(self.slots[slot].image_available) {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    fn write_uniforms(&mut self, image_index: u32, draws: &[DrawItem<'_>]) -> Result<()> {
        let transfer = self.uniforms.transfer_mut();
        let mut objects = 0;
        for draw in draws {
            transfer.write(
                draw.object,
                &ModelTransform {
                    model: draw.transform,
                },
            )?;
            objects = objects.max(draw.object + 1);
        }
        self.uniforms
            .update(self.ctx.device(), image_index as usize, &self.camera, objects)
    }

    fn record(&mut self, slot: usize, image_index: u32, draws: &[DrawItem<'_>]) -> Result<()> {
        let device = self.ctx.device();
        let cmd = self.slots[slot].command_buffer;
        let extent = self.swapchain.extent();
        let image = image_index as usize;

        unsafe {
            device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
            device.begin_command_buffer(cmd, &vk::CommandBufferBeginInfo::default())?;

            let clear_values = [
                vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: self.config.clear_color,
                    },
                },
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: 1.0,
                        stencil: 0,
                    },
                },
            ];
            let begin = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass)
                .framebuffer(self.framebuffers[image])
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(cmd, &begin, vk::SubpassContents::INLINE);
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline.handle());

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(
                cmd,
                0,
                &[vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                }],
            );

            let stride = self.uniforms.stride() as u32;
            for draw in draws {
                let push = ModelTransform {
                    model: draw.transform,
                };
                for mesh_id in draw.meshes {
                    let Some(mesh) = self.meshes.get(mesh_id.index()) else {
                        continue;
                    };
                    device.cmd_bind_vertex_buffers(cmd, 0, &[mesh.vertex_buffer()], &[0]);
                    device.cmd_bind_index_buffer(cmd, mesh.index_buffer(), 0, vk::IndexType::UINT32);
                    device.cmd_push_constants(
                        cmd,
                        self.pipeline.layout(),
                        vk::ShaderStageFlags::VERTEX,
                        0,
                        bytemuck::bytes_of(&push),
                    );
                    let sets = [
                        self.uniforms.set(image),
                        self.textures.descriptor(mesh.texture_id()),
                    ];
                    let dynamic_offset = [draw.object as u32 * stride];
                    device.cmd_bind_descriptor_sets(
                        cmd,
                        vk::PipelineBindPoint::GRAPHICS,
                        self.pipeline.layout(),
                        0,
                        &sets,
                        &dynamic_offset,
                    );
                    device.cmd_draw_indexed(cmd, mesh.index_count(), 1, 0, 0, 0);
                }
            }

            device.cmd_end_render_pass(cmd);
            device.end_command_buffer(cmd)?;
        }
        Ok(())
    }

    fn reset_slot(&mut self, slot: usize) -> Result<()> {
        unsafe { self.ctx.device().reset_fences(&[self.slots[slot].in_flight])? };
        Ok(())
    }

    fn submit(&mut self, slot: usize) -> Result<()> {
        let s = self.slots[slot];
        let waits = [s.image_available];
        let stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signals = [s.render_finished];
        let buffers = [s.command_buffer];
        let submit = vk::SubmitInfo::default()
            .wait_semaphores(&waits)
            .wait_dst_stage_mask(&stages)
            .command_buffers(&buffers)
            .signal_semaphores(&signals);
        unsafe {
            self.ctx
                .device()
                .queue_submit(self.ctx.graphics_queue(), &[submit], s.in_flight)?
        };
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        match self.swapchain.present(
            self.ctx.present_queue(),
            self.slots[slot].render_finished,
            image_index,
        ) {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    /// Rebuilds swapchain, attachments and framebuffers, plus whatever the
    /// [`RecreationPlan`] says depends on the changed format or image count.
    /// Postponed while the framebuffer has zero area.
    fn recreate_swapchain(&mut self) -> Result<()> {
        let (w, h) = self.framebuffer_size;
        if w == 0 || h == 0 {
            log::debug!("framebuffer is empty, postponing swapchain recreation");
            return Ok(());
        }

        self.ctx.wait_idle()?;
        let device = self.ctx.device().clone();

        let mut swapchain = Swapchain::new(
            &self.instance,
            &self.ctx,
            self.surface,
            self.framebuffer_size,
            &self.config,
            self.swapchain.handle(),
        )?;
        let old_format = self.swapchain.format();
        let plan = recreation_plan(
            old_format,
            swapchain.format(),
            self.swapchain.image_count(),
            swapchain.image_count(),
        );
        std::mem::swap(&mut self.swapchain, &mut swapchain);
        unsafe {
            attachments::destroy_framebuffers(&device, &mut self.framebuffers);
            self.targets.destroy(&device);
            swapchain.destroy(&device);
        }

        if plan.render_pass {
            log::info!(
                "surface format changed from {:?} to {:?}, rebuilding render pass and pipeline",
                old_format,
                self.swapchain.format()
            );
            unsafe {
                self.pipeline.destroy(&device);
                device.destroy_render_pass(self.render_pass, None);
            }
            self.render_pass = vk::RenderPass::null();
            self.render_pass = pipeline::create_render_pass(
                &device,
                self.swapchain.format(),
                self.depth_format,
                self.ctx.msaa_samples(),
            )?;
            self.pipeline = build_pipeline(
                &self.ctx,
                self.render_pass,
                [self.uniforms.layout(), self.textures.set_layout()],
                &self.config,
            )?;
        }

        let extent = self.swapchain.extent();
        self.targets =
            RenderTargets::new(&self.ctx, extent, self.swapchain.format(), self.depth_format)?;
        self.framebuffers = attachments::create_framebuffers(
            &device,
            self.render_pass,
            &self.targets,
            self.swapchain.views(),
            extent,
        )?;
        if plan.uniforms {
            self.uniforms.rebuild(&self.ctx, self.swapchain.image_count())?;
        }
        self.camera = self.config.camera.view_projection(extent.width, extent.height);

        log::info!(
            "swapchain recreated at {}x{} ({} images)",
            extent.width,
            extent.height,
            self.swapchain.image_count()
        );
        Ok(())
    }
}
