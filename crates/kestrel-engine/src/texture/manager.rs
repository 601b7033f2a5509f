use std::path::Path;

use ash::vk;

use crate::descriptors::SamplerPools;
use crate::device::DeviceContext;
use crate::error::{EngineError, Result};
use crate::memory::{self, Buffer, Image, ImageDesc};

use super::decoder::{DecodedImage, ImageCrateDecoder, ImageDecoder};
use super::mip::{mip_chain, mip_levels};

/// Texel format of every texture.
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Texture index used by meshes without a diffuse map.
pub const DEFAULT_TEXTURE: usize = 0;

struct Texture {
    image: Image,
    view: vk::ImageView,
    descriptor: vk::DescriptorSet,
}

/// Owns every texture image, the shared sampler and the sampler descriptor sets.
pub struct TextureManager {
    sampler: vk::Sampler,
    pools: SamplerPools,
    textures: Vec<Texture>,
    decoder: Box<dyn ImageDecoder>,
}

impl Default for TextureManager {
    fn default() -> Self {
        Self {
            sampler: vk::Sampler::null(),
            pools: SamplerPools::default(),
            textures: Vec::new(),
            decoder: Box::new(ImageCrateDecoder),
        }
    }
}

impl TextureManager {
    /// Creates the sampler, the descriptor pools and the 1×1 white default
    /// texture at [`DEFAULT_TEXTURE`].
    pub fn new(
        ctx: &DeviceContext,
        cmd_pool: vk::CommandPool,
        sets_per_pool: u32,
        decoder: Box<dyn ImageDecoder>,
    ) -> Result<Self> {
        let sampler = create_sampler(ctx)?;
        let pools = match SamplerPools::new(ctx.device(), sets_per_pool) {
            Ok(p) => p,
            Err(e) => {
                unsafe { ctx.device().destroy_sampler(sampler, None) };
                return Err(e);
            }
        };

        let mut this = Self {
            sampler,
            pools,
            textures: Vec::new(),
            decoder,
        };
        let white = DecodedImage {
            width: 1,
            height: 1,
            pixels: vec![255; 4],
        };
        if let Err(e) = this.create_from_pixels(ctx, cmd_pool, &white) {
            unsafe { this.destroy(ctx.device()) };
            return Err(e);
        }
        Ok(this)
    }

    /// Decodes `path` and uploads it with a full mip chain. Returns its index.
    pub fn create_texture(
        &mut self,
        ctx: &DeviceContext,
        cmd_pool: vk::CommandPool,
        path: &Path,
    ) -> Result<usize> {
        let decoded = self.decoder.decode(path)?;
        let index = self.create_from_pixels(ctx, cmd_pool, &decoded)?;
        log::debug!(
            "texture {index} loaded from {} ({}x{})",
            path.display(),
            decoded.width,
            decoded.height
        );
        Ok(index)
    }

    pub fn create_from_pixels(
        &mut self,
        ctx: &DeviceContext,
        cmd_pool: vk::CommandPool,
        decoded: &DecodedImage,
    ) -> Result<usize> {
        let device = ctx.device();
        let (mut image, levels) = create_texture_image(ctx, cmd_pool, decoded)?;

        let view = match memory::create_image_view(
            device,
            image.handle,
            TEXTURE_FORMAT,
            vk::ImageAspectFlags::COLOR,
            levels,
        ) {
            Ok(v) => v,
            Err(e) => {
                unsafe { image.destroy(device) };
                return Err(e);
            }
        };

        let descriptor = match self.pools.allocate(device, view, self.sampler) {
            Ok(d) => d,
            Err(e) => {
                unsafe {
                    device.destroy_image_view(view, None);
                    image.destroy(device);
                }
                return Err(e);
            }
        };

        self.textures.push(Texture {
            image,
            view,
            descriptor,
        });
        Ok(self.textures.len() - 1)
    }

    /// Descriptor set for texture `index`, or the default texture's when
    /// `index` is unknown.
    pub fn descriptor(&self, index: usize) -> vk::DescriptorSet {
        self.textures
            .get(index)
            .or_else(|| self.textures.get(DEFAULT_TEXTURE))
            .map(|t| t.descriptor)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn set_layout(&self) -> vk::DescriptorSetLayout {
        self.pools.layout()
    }

    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            for mut t in self.textures.drain(..) {
                device.destroy_image_view(t.view, None);
                t.image.destroy(device);
            }
            self.pools.destroy(device);
            if self.sampler != vk::Sampler::null() {
                device.destroy_sampler(self.sampler, None);
                self.sampler = vk::Sampler::null();
            }
        }
    }
}

fn create_sampler(ctx: &DeviceContext) -> Result<vk::Sampler> {
    let info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .anisotropy_enable(true)
        .max_anisotropy(ctx.limits().max_sampler_anisotropy);
    Ok(unsafe { ctx.device().create_sampler(&info, None)? })
}

/// Uploads `decoded` into an optimal-tiling image, generates its mips and
/// leaves every level in `SHADER_READ_ONLY_OPTIMAL`.
fn create_texture_image(
    ctx: &DeviceContext,
    cmd_pool: vk::CommandPool,
    decoded: &DecodedImage,
) -> Result<(Image, u32)> {
    let device = ctx.device();
    let levels = mip_levels(decoded.width, decoded.height);

    let mut staging = Buffer::new(
        ctx,
        decoded.pixels.len() as vk::DeviceSize,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;

    let result = (|| {
        staging.write_bytes(device, 0, &decoded.pixels)?;

        let mut image = memory::create_image(
            ctx,
            &ImageDesc {
                width: decoded.width,
                height: decoded.height,
                mip_levels: levels,
                samples: vk::SampleCountFlags::TYPE_1,
                format: TEXTURE_FORMAT,
                tiling: vk::ImageTiling::OPTIMAL,
                usage: vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST
                    | vk::ImageUsageFlags::SAMPLED,
                memory: vk::MemoryPropertyFlags::DEVICE_LOCAL,
            },
        )?;

        let upload = (|| {
            memory::transition_image_layout(
                ctx,
                cmd_pool,
                image.handle,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                levels,
            )?;
            memory::copy_buffer_to_image(
                ctx,
                cmd_pool,
                staging.handle,
                image.handle,
                decoded.width,
                decoded.height,
            )?;
            generate_mipmaps(ctx, cmd_pool, image.handle, decoded.width, decoded.height)
        })();

        match upload {
            Ok(()) => Ok((image, levels)),
            Err(e) => {
                unsafe { image.destroy(device) };
                Err(e)
            }
        }
    })();

    unsafe { staging.destroy(device) };
    result
}

/// Fills levels 1.. by linear blits from the level above. Expects every level
/// in `TRANSFER_DST_OPTIMAL`; leaves every level in `SHADER_READ_ONLY_OPTIMAL`.
fn generate_mipmaps(
    ctx: &DeviceContext,
    cmd_pool: vk::CommandPool,
    image: vk::Image,
    width: u32,
    height: u32,
) -> Result<()> {
    let features = ctx.format_properties(TEXTURE_FORMAT).optimal_tiling_features;
    if !features.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR) {
        return Err(EngineError::BlitUnsupported(TEXTURE_FORMAT));
    }

    let chain = mip_chain(width, height);
    let last_level = chain.last().map_or(0, |b| b.level);

    memory::submit_once(ctx, cmd_pool, |device, cmd| {
        let barrier = |level: u32,
                       old: vk::ImageLayout,
                       new: vk::ImageLayout,
                       src_access: vk::AccessFlags,
                       dst_access: vk::AccessFlags| {
            vk::ImageMemoryBarrier::default()
                .image(image)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(level)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                )
                .old_layout(old)
                .new_layout(new)
                .src_access_mask(src_access)
                .dst_access_mask(dst_access)
        };
        let pipeline_barrier = |src: vk::PipelineStageFlags,
                                dst: vk::PipelineStageFlags,
                                b: vk::ImageMemoryBarrier<'_>| unsafe {
            device.cmd_pipeline_barrier(cmd, src, dst, vk::DependencyFlags::empty(), &[], &[], &[b]);
        };

        for blit in &chain {
            let src_level = blit.level - 1;
            pipeline_barrier(
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::TRANSFER,
                barrier(
                    src_level,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk::AccessFlags::TRANSFER_WRITE,
                    vk::AccessFlags::TRANSFER_READ,
                ),
            );

            let subresource = |level| {
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .mip_level(level)
                    .base_array_layer(0)
                    .layer_count(1)
            };
            let region = vk::ImageBlit::default()
                .src_offsets([vk::Offset3D::default(), blit.src])
                .src_subresource(subresource(src_level))
                .dst_offsets([vk::Offset3D::default(), blit.dst])
                .dst_subresource(subresource(blit.level));
            unsafe {
                device.cmd_blit_image(
                    cmd,
                    image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                    vk::Filter::LINEAR,
                )
            };

            pipeline_barrier(
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                barrier(
                    src_level,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    vk::AccessFlags::TRANSFER_READ,
                    vk::AccessFlags::SHADER_READ,
                ),
            );
        }

        // The smallest level was only ever written.
        pipeline_barrier(
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            barrier(
                last_level,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::SHADER_READ,
            ),
        );
    })
}
