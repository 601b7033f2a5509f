use ash::vk;

use crate::device::DeviceContext;
use crate::error::Result;
use crate::memory::{self, Buffer};

use super::vertex::Vertex;

/// Geometry for one sub-mesh before upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Index into the importer's material list.
    pub material: Option<usize>,
}

/// Device-local vertex and index buffers for one sub-mesh.
pub struct Mesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    texture_id: usize,
}

impl Mesh {
    pub fn new(
        ctx: &DeviceContext,
        cmd_pool: vk::CommandPool,
        data: &MeshData,
        texture_id: usize,
    ) -> Result<Self> {
        let vertex_buffer = memory::create_device_local_buffer(
            ctx,
            cmd_pool,
            bytemuck::cast_slice(&data.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = match memory::create_device_local_buffer(
            ctx,
            cmd_pool,
            bytemuck::cast_slice(&data.indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        ) {
            Ok(b) => b,
            Err(e) => {
                let mut vertex_buffer = vertex_buffer;
                unsafe { vertex_buffer.destroy(ctx.device()) };
                return Err(e);
            }
        };

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
            texture_id,
        })
    }

    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertex_buffer.handle
    }

    pub fn index_buffer(&self) -> vk::Buffer {
        self.index_buffer.handle
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn texture_id(&self) -> usize {
        self.texture_id
    }

    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            self.vertex_buffer.destroy(device);
            self.index_buffer.destroy(device);
        }
    }
}
