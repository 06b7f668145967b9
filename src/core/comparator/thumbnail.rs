//! Built-in embedding: a small grayscale thumbnail of the page.
//!
//! Uses fast_image_resize for the downscale, which picks AVX2/NEON SIMD
//! when available. Pages are large (a 150 dpi A4 render is ~1240x1754),
//! so this is where most of the embedding time goes.

use super::EmbeddingModel;
use crate::error::CompareError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{imageops, RgbaImage};

/// Default thumbnail edge in pixels
pub const DEFAULT_SIDE: u32 = 32;

/// Embeds a page as the normalized intensities of a `side x side` thumbnail
#[derive(Debug, Clone)]
pub struct ThumbnailEmbedder {
    side: u32,
}

impl ThumbnailEmbedder {
    pub fn new(side: u32) -> Self {
        Self { side: side.max(1) }
    }

    fn thumbnail(&self, image: &RgbaImage) -> Result<Vec<u8>, CompareError> {
        let gray = imageops::grayscale(image);
        let (width, height) = gray.dimensions();

        if width == 0 || height == 0 {
            return Err(CompareError::Model("page has no pixels".to_string()));
        }

        let src = Image::from_vec_u8(width, height, gray.into_raw(), PixelType::U8)
            .map_err(|e| CompareError::Model(format!("failed to create source image: {}", e)))?;
        let mut dst = Image::new(self.side, self.side, PixelType::U8);

        // Resizer holds scratch buffers, so one per call keeps `embed` shareable
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
        Resizer::new()
            .resize(&src, &mut dst, &options)
            .map_err(|e| CompareError::Model(format!("resize failed: {}", e)))?;

        Ok(dst.into_vec())
    }
}

impl Default for ThumbnailEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_SIDE)
    }
}

impl EmbeddingModel for ThumbnailEmbedder {
    fn embed(&self, image: &RgbaImage) -> Result<Vec<f32>, CompareError> {
        Ok(self
            .thumbnail(image)?
            .into_iter()
            .map(|v| f32::from(v) / 255.0)
            .collect())
    }

    fn name(&self) -> &str {
        "thumbnail"
    }
}
