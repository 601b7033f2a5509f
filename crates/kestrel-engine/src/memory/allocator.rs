use ash::vk;

use crate::device::DeviceContext;
use crate::error::{EngineError, Result};

use super::commands;

/// Finds a memory type allowed by `type_bits` that has all of `flags`.
pub fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Result<u32> {
    (0..props.memory_type_count)
        .find(|&i| {
            let allowed = type_bits & (1 << i) != 0;
            allowed && props.memory_types[i as usize].property_flags.contains(flags)
        })
        .ok_or(EngineError::NoCompatibleMemoryType { type_bits, flags })
}

/// Returns the first candidate whose features for `tiling` include `features`.
///
/// `query` supplies the device's format properties; this keeps the search
/// independent of a live device.
pub fn first_supported_format(
    candidates: &[vk::Format],
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
    query: impl Fn(vk::Format) -> vk::FormatProperties,
) -> Result<vk::Format> {
    candidates
        .iter()
        .copied()
        .find(|&format| {
            let props = query(format);
            match tiling {
                vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
                vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
                _ => false,
            }
        })
        .ok_or_else(|| EngineError::UnsupportedFormat {
            candidates: candidates.to_vec(),
            tiling,
            features,
        })
}

/// Device-backed form of [`first_supported_format`].
pub fn choose_supported_format(
    ctx: &DeviceContext,
    candidates: &[vk::Format],
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
) -> Result<vk::Format> {
    first_supported_format(candidates, tiling, features, |f| ctx.format_properties(f))
}

/// Depth format portable across devices.
pub fn depth_format(ctx: &DeviceContext) -> Result<vk::Format> {
    choose_supported_format(
        ctx,
        &[
            vk::Format::D32_SFLOAT,
            vk::Format::D32_SFLOAT_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
        ],
        vk::ImageTiling::OPTIMAL,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
    )
}

/// A buffer with its own dedicated allocation.
#[derive(Debug, Default)]
pub struct Buffer {
    pub handle: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
}

impl Buffer {
    pub fn new(
        ctx: &DeviceContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        let device = ctx.device();
        let info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let handle = unsafe { device.create_buffer(&info, None)? };

        let requirements = unsafe { device.get_buffer_memory_requirements(handle) };
        let memory = match allocate(ctx, requirements, properties) {
            Ok(m) => m,
            Err(e) => {
                unsafe { device.destroy_buffer(handle, None) };
                return Err(e);
            }
        };
        bind_or_release(
            || unsafe { device.bind_buffer_memory(handle, memory, 0) },
            || unsafe {
                device.destroy_buffer(handle, None);
                device.free_memory(memory, None);
            },
        )?;

        Ok(Self { handle, memory, size })
    }

    /// Copies `bytes` into host-visible, host-coherent memory at `offset`.
    pub fn write_bytes(&self, device: &ash::Device, offset: vk::DeviceSize, bytes: &[u8]) -> Result<()> {
        debug_assert!(offset + bytes.len() as vk::DeviceSize <= self.size);
        if bytes.is_empty() {
            return Ok(());
        }
        unsafe {
            let ptr = device.map_memory(
                self.memory,
                offset,
                bytes.len() as vk::DeviceSize,
                vk::MemoryMapFlags::empty(),
            )?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            device.unmap_memory(self.memory);
        }
        Ok(())
    }

    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            if self.handle != vk::Buffer::null() {
                device.destroy_buffer(self.handle, None);
            }
            if self.memory != vk::DeviceMemory::null() {
                device.free_memory(self.memory, None);
            }
        }
        *self = Self::default();
    }
}

/// Uploads `bytes` into a new device-local buffer through a staging buffer.
pub fn create_device_local_buffer(
    ctx: &DeviceContext,
    pool: vk::CommandPool,
    bytes: &[u8],
    usage: vk::BufferUsageFlags,
) -> Result<Buffer> {
    let size = bytes.len() as vk::DeviceSize;
    let mut staging = Buffer::new(
        ctx,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;

    let result = (|| {
        staging.write_bytes(ctx.device(), 0, bytes)?;
        let mut buffer = Buffer::new(
            ctx,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        if let Err(e) = commands::copy_buffer(ctx, pool, staging.handle, buffer.handle, size) {
            unsafe { buffer.destroy(ctx.device()) };
            return Err(e);
        }
        Ok(buffer)
    })();

    unsafe { staging.destroy(ctx.device()) };
    result
}

/// Parameters for [`create_image`].
#[derive(Debug, Copy, Clone)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub samples: vk::SampleCountFlags,
    pub format: vk::Format,
    pub tiling: vk::ImageTiling,
    pub usage: vk::ImageUsageFlags,
    pub memory: vk::MemoryPropertyFlags,
}

/// A 2D image with its own dedicated allocation.
#[derive(Debug, Default)]
pub struct Image {
    pub handle: vk::Image,
    pub memory: vk::DeviceMemory,
}

impl Image {
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            if self.handle != vk::Image::null() {
                device.destroy_image(self.handle, None);
            }
            if self.memory != vk::DeviceMemory::null() {
                device.free_memory(self.memory, None);
            }
        }
        *self = Self::default();
    }
}

/// Single allocation path for depth targets, multisample targets and textures.
pub fn create_image(ctx: &DeviceContext, desc: &ImageDesc) -> Result<Image> {
    let device = ctx.device();
    let info = vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .extent(vk::Extent3D {
            width: desc.width,
            height: desc.height,
            depth: 1,
        })
        .mip_levels(desc.mip_levels)
        .array_layers(1)
        .format(desc.format)
        .tiling(desc.tiling)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .usage(desc.usage)
        .samples(desc.samples)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let handle = unsafe { device.create_image(&info, None)? };

    let requirements = unsafe { device.get_image_memory_requirements(handle) };
    let memory = match allocate(ctx, requirements, desc.memory) {
        Ok(m) => m,
        Err(e) => {
            unsafe { device.destroy_image(handle, None) };
            return Err(e);
        }
    };
    bind_or_release(
        || unsafe { device.bind_image_memory(handle, memory, 0) },
        || unsafe {
            device.destroy_image(handle, None);
            device.free_memory(memory, None);
        },
    )?;

    Ok(Image { handle, memory })
}

pub fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
    mip_levels: u32,
) -> Result<vk::ImageView> {
    let info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(aspect)
                .base_mip_level(0)
                .level_count(mip_levels)
                .base_array_layer(0)
                .layer_count(1),
        );
    Ok(unsafe { device.create_image_view(&info, None)? })
}

/// Runs `bind`; on failure runs `release` so the object and its memory do
/// not outlive the error.
fn bind_or_release(
    bind: impl FnOnce() -> ash::prelude::VkResult<()>,
    release: impl FnOnce(),
) -> Result<()> {
    bind().map_err(|e| {
        release();
        EngineError::from(e)
    })
}

fn allocate(
    ctx: &DeviceContext,
    requirements: vk::MemoryRequirements,
    properties: vk::MemoryPropertyFlags,
) -> Result<vk::DeviceMemory> {
    let type_index =
        find_memory_type(ctx.memory_properties(), requirements.memory_type_bits, properties)?;
    let info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(type_index);
    Ok(unsafe { ctx.device().allocate_memory(&info, None)? })
}
