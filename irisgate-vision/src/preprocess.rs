use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array3;

use crate::clahe;

/// Turns raw iris photographs into the fixed-shape tensor the embedding
/// model expects: grayscale, resized, contrast enhanced and masked to the
/// circular iris region, laid out as (H, W, 1) with values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    /// Output height and width in pixels.
    pub size: u32,
    /// CLAHE clip limit; `0.0` disables clipping.
    pub clip_limit: f32,
    /// CLAHE tiles per axis.
    pub tile_grid: u32,
    /// Distance between the mask circle and the image border.
    pub mask_margin: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            size: 224,
            clip_limit: 2.0,
            tile_grid: 8,
            mask_margin: 10,
        }
    }
}

impl Preprocessor {
    /// Decode an encoded image (BMP, PNG, JPEG, ...) and preprocess it.
    pub fn process_bytes(&self, raw: &[u8]) -> Result<Array3<f32>> {
        let img = image::load_from_memory(raw).context("decoding iris image")?;
        self.process(&img)
    }

    pub fn process(&self, img: &DynamicImage) -> Result<Array3<f32>> {
        if self.size == 0 {
            anyhow::bail!("preprocess size must be non-zero");
        }
        log::debug!("Original image shape: {:?}", img.dimensions());

        let gray = img.to_luma8();
        let resized = image::imageops::resize(&gray, self.size, self.size, FilterType::Triangle);
        let enhanced = clahe::equalize(&resized, self.clip_limit, self.tile_grid)
            .context("enhancing iris contrast")?;

        let size = self.size as usize;
        let center = (self.size / 2) as i64;
        let radius = (self.size / 2).saturating_sub(self.mask_margin) as i64;
        let tensor = Array3::from_shape_fn((size, size, 1), |(y, x, _)| {
            let dx = x as i64 - center;
            let dy = y as i64 - center;
            if dx * dx + dy * dy <= radius * radius {
                enhanced.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
            } else {
                0.0
            }
        });

        log::debug!("Final tensor shape: {:?}", tensor.shape());
        Ok(tensor)
    }
}
