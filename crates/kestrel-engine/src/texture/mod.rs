//! Texture decoding, upload, mip generation and sampler descriptors.

mod decoder;
mod manager;
mod mip;

pub use decoder::{DecodedImage, ImageCrateDecoder, ImageDecoder};
pub use manager::{DEFAULT_TEXTURE, TEXTURE_FORMAT, TextureManager};
pub use mip::{MipBlit, mip_chain, mip_levels};
