use std::path::Path;

use crate::error::{EngineError, Result};

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Turns an image file into RGBA8 pixels.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage>;
}

/// [`ImageDecoder`] backed by the `image` crate (PNG, JPEG, BMP, TGA).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let img = image::open(path).map_err(|e| EngineError::Import {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(DecodedImage {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_to_rgba() {
        let path = std::env::temp_dir().join(format!("kestrel-decode-{}.png", std::process::id()));
        let mut img = image::RgbImage::new(3, 2);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.save(&path).unwrap();

        let decoded = ImageCrateDecoder.decode(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.pixels.len(), 3 * 2 * 4);
        assert_eq!(&decoded.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn missing_file_is_import_error() {
        let err = ImageCrateDecoder.decode(Path::new("no/such/texture.png")).unwrap_err();
        assert!(matches!(err, EngineError::Import { .. }));
    }
}
