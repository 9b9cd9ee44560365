//! Contrast Limited Adaptive Histogram Equalization on 8-bit grayscale images.
//!
//! The image is split into a `grid x grid` layout of tiles. Each tile gets its
//! own equalization lookup table built from a clipped histogram, and every
//! output pixel is bilinearly interpolated between the tables of the four
//! nearest tile centres so tile seams do not show.

use anyhow::Result;
use image::{GrayImage, Luma};

const BINS: usize = 256;

type Lut = [u8; BINS];

/// Apply CLAHE to `img`.
///
/// `clip_limit` is relative to the average bin height of a tile; a value of
/// `0.0` or below disables clipping, which turns this into plain tiled
/// histogram equalization.
pub fn equalize(img: &GrayImage, clip_limit: f32, grid: u32) -> Result<GrayImage> {
    let (width, height) = img.dimensions();
    if grid == 0 {
        anyhow::bail!("CLAHE tile grid must be non-zero");
    }
    if width < grid || height < grid {
        anyhow::bail!(
            "image {}x{} is smaller than the {}x{} CLAHE tile grid",
            width,
            height,
            grid,
            grid
        );
    }

    let mut luts = Vec::with_capacity((grid * grid) as usize);
    for ty in 0..grid {
        let (y0, y1) = tile_span(ty, height, grid);
        for tx in 0..grid {
            let (x0, x1) = tile_span(tx, width, grid);
            luts.push(tile_lut(img, x0, x1, y0, y1, clip_limit));
        }
    }

    let tile_w = width as f32 / grid as f32;
    let tile_h = height as f32 / grid as f32;
    let last = grid as i64 - 1;
    let lut_at = |tx: i64, ty: i64| &luts[(ty * grid as i64 + tx) as usize];

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let tyf = y as f32 / tile_h - 0.5;
        let ty1 = tyf.floor() as i64;
        let ya = tyf - ty1 as f32;
        let (ty1, ty2) = (ty1.max(0), (ty1 + 1).min(last));

        for x in 0..width {
            let txf = x as f32 / tile_w - 0.5;
            let tx1 = txf.floor() as i64;
            let xa = txf - tx1 as f32;
            let (tx1, tx2) = (tx1.max(0), (tx1 + 1).min(last));

            let v = img.get_pixel(x, y)[0] as usize;
            let top = lut_at(tx1, ty1)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty1)[v] as f32 * xa;
            let bottom =
                lut_at(tx1, ty2)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty2)[v] as f32 * xa;
            let value = top * (1.0 - ya) + bottom * ya;

            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    Ok(out)
}

/// Half-open pixel range covered by tile `index` along an axis of `len` pixels.
fn tile_span(index: u32, len: u32, grid: u32) -> (u32, u32) {
    (index * len / grid, (index + 1) * len / grid)
}

fn tile_lut(img: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32, clip_limit: f32) -> Lut {
    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let area = (x1 - x0) * (y1 - y0);
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        clip_histogram(&mut hist, limit);
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; BINS];
    let mut cumulative = 0u32;
    for (bin, count) in hist.iter().enumerate() {
        cumulative += count;
        lut[bin] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Cap every bin at `limit` and spread the excess evenly over all bins.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }
    if excess == 0 {
        return;
    }

    let per_bin = excess / BINS as u32;
    let residual = (excess % BINS as u32) as usize;
    for count in hist.iter_mut() {
        *count += per_bin;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for bin in (0..BINS).step_by(step).take(residual) {
            hist[bin] += 1;
        }
    }
}
