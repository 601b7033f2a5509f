//! The engine's public surface: initialise once, load models, update their
//! transforms and draw frames.

mod attachments;
mod vulkan;

use std::path::Path;

use glam::Mat4;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::config::{CameraConfig, RendererConfig};
use crate::error::{EngineError, Result};
use crate::frame::{FrameBackend, FrameExecutor, FrameOutcome, FrameState};
use crate::mesh::{MeshImporter, ModelId, ModelRegistry, ObjImporter};
use crate::texture::{DEFAULT_TEXTURE, ImageCrateDecoder, ImageDecoder};

pub use vulkan::RenderCore;

/// Vulkan renderer for a single window.
///
/// `clean` runs on drop if it has not been called.
pub struct Renderer {
    core: Option<RenderCore>,
    executor: FrameExecutor,
    models: ModelRegistry,
    importer: Box<dyn MeshImporter>,
    needs_recreate: bool,
}

impl Renderer {
    /// Builds every GPU component for `window`, whose framebuffer is
    /// `framebuffer_size` pixels.
    pub fn init<W>(window: &W, framebuffer_size: (u32, u32), config: RendererConfig) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        Self::with_collaborators(
            window,
            framebuffer_size,
            config,
            Box::new(ObjImporter),
            Box::new(ImageCrateDecoder),
        )
    }

    /// Like [`Renderer::init`] with a custom model importer and image decoder.
    pub fn with_collaborators<W>(
        window: &W,
        framebuffer_size: (u32, u32),
        config: RendererConfig,
        importer: Box<dyn MeshImporter>,
        decoder: Box<dyn ImageDecoder>,
    ) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let display = window.display_handle()?.as_raw();
        let handle = window.window_handle()?.as_raw();

        let frames = config.frames_in_flight;
        let capacity = config.max_objects;
        let mut core = RenderCore::new(display, handle, framebuffer_size, config, decoder)?;

        let executor = match FrameExecutor::new(frames, core.image_count()) {
            Ok(e) => e,
            Err(e) => {
                unsafe { core.destroy() };
                return Err(e);
            }
        };

        log::info!("renderer initialised ({frames} frames in flight, {capacity} objects)");
        Ok(Self {
            core: Some(core),
            executor,
            models: ModelRegistry::new(capacity),
            importer,
            needs_recreate: false,
        })
    }

    /// Renders and presents one frame of every model.
    pub fn draw(&mut self) -> Result<FrameOutcome> {
        let core = self.core.as_mut().ok_or(EngineError::Destroyed)?;

        let (w, h) = core.framebuffer_size();
        if w == 0 || h == 0 {
            return Ok(FrameOutcome::Skipped);
        }
        if self.needs_recreate {
            self.executor.recreate(core)?;
            self.needs_recreate = false;
        }

        let draws = self.models.draw_list();
        self.executor.draw_frame(core, &draws)
    }

    /// Overwrites a model's transform. Unknown ids are ignored.
    pub fn update_model(&mut self, id: ModelId, transform: Mat4) {
        if !self.models.update(id, transform) {
            log::trace!("update_model: unknown model {}", id.index());
        }
    }

    /// Imports `path`, uploads its meshes and textures and returns its id.
    pub fn create_mesh_model(&mut self, path: impl AsRef<Path>) -> Result<ModelId> {
        let path = path.as_ref();
        let core = self.core.as_mut().ok_or(EngineError::Destroyed)?;
        if self.models.len() >= self.models.capacity() {
            return Err(EngineError::ObjectCapacityExceeded {
                capacity: self.models.capacity(),
            });
        }

        let imported = self.importer.import(path)?;

        let mut material_textures = Vec::with_capacity(imported.material_textures.len());
        for texture in &imported.material_textures {
            let id = match texture {
                Some(p) => core.load_texture(p)?,
                None => DEFAULT_TEXTURE,
            };
            material_textures.push(id);
        }

        let mut mesh_ids = Vec::with_capacity(imported.meshes.len());
        for data in &imported.meshes {
            let texture = data
                .material
                .and_then(|m| material_textures.get(m).copied())
                .unwrap_or(DEFAULT_TEXTURE);
            mesh_ids.push(core.upload_mesh(data, texture)?);
        }

        let id = self.models.insert(mesh_ids)?;
        log::debug!(
            "model {} loaded from {} ({} meshes, {} materials)",
            id.index(),
            path.display(),
            imported.meshes.len(),
            imported.material_textures.len()
        );
        Ok(id)
    }

    /// Records the new framebuffer size; the swapchain is rebuilt before the
    /// next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(core) = self.core.as_mut() {
            if core.framebuffer_size() != (width, height) {
                core.set_framebuffer_size((width, height));
                self.needs_recreate = true;
            }
        }
    }

    pub fn set_camera(&mut self, camera: CameraConfig) {
        if let Some(core) = self.core.as_mut() {
            core.set_camera(camera);
        }
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn frame_state(&self) -> FrameState {
        self.executor.state()
    }

    pub fn current_frame(&self) -> usize {
        self.executor.current_frame()
    }

    /// Waits for the GPU and releases every resource. Safe to call twice.
    pub fn clean(&mut self) {
        if let Some(mut core) = self.core.take() {
            unsafe { core.destroy() };
            self.models.clear();
        }
    }

    pub fn is_clean(&self) -> bool {
        self.core.is_none()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.clean();
    }
}
