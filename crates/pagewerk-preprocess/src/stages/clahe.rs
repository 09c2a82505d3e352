// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalisation.
//
// The page is split into a `tile_grid_size` x `tile_grid_size` grid. Each tile
// gets its own equalisation curve from a histogram whose bins are capped at
// `clip_limit` times the uniform height (the excess is spread evenly), and
// every pixel is mapped by bilinear interpolation between the curves of the
// four nearest tile centres.

use image::GrayImage;
use pagewerk_core::{Result, StageConfig};
use tracing::debug;

use super::schema::{float_param, int_param};

struct TileGrid {
    tile_w: u32,
    tile_h: u32,
    cols: u32,
    rows: u32,
}

impl TileGrid {
    fn new(width: u32, height: u32, grid: u32) -> Self {
        let tile_w = width.div_ceil(grid).max(1);
        let tile_h = height.div_ceil(grid).max(1);
        Self {
            tile_w,
            tile_h,
            cols: width.div_ceil(tile_w).max(1),
            rows: height.div_ceil(tile_h).max(1),
        }
    }
}

pub(crate) fn equalize(image: &GrayImage, config: &StageConfig) -> Result<GrayImage> {
    let clip_limit = float_param(config, "clip_limit")?;
    let grid_size = int_param(config, "tile_grid_size")? as u32;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Ok(image.clone());
    }

    let grid = TileGrid::new(width, height, grid_size);
    let luts = build_luts(image, &grid, clip_limit);

    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        let (ty0, ty1, wy) = neighbours(y, grid.tile_h, grid.rows);
        for x in 0..width {
            let (tx0, tx1, wx) = neighbours(x, grid.tile_w, grid.cols);
            let v = image.get_pixel(x, y).0[0] as usize;
            let lut = |tx: u32, ty: u32| luts[(ty * grid.cols + tx) as usize][v] as f32;

            let top = lut(tx0, ty0) * (1.0 - wx) + lut(tx1, ty0) * wx;
            let bottom = lut(tx0, ty1) * (1.0 - wx) + lut(tx1, ty1) * wx;
            let value = top * (1.0 - wy) + bottom * wy;
            output.put_pixel(x, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    debug!(clip_limit, grid_size, tiles = luts.len(), "CLAHE applied");
    Ok(output)
}

/// The two tile indices around `pos` along one axis and the weight of the
/// second one.
fn neighbours(pos: u32, tile: u32, count: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }
    let lo = (f.floor() as u32).min(count - 1);
    let hi = (lo + 1).min(count - 1);
    let weight = if hi == lo { 0.0 } else { f - lo as f32 };
    (lo, hi, weight)
}

fn build_luts(image: &GrayImage, grid: &TileGrid, clip_limit: f64) -> Vec<[u8; 256]> {
    let (width, height) = image.dimensions();
    let mut luts = Vec::with_capacity((grid.cols * grid.rows) as usize);

    for ty in 0..grid.rows {
        for tx in 0..grid.cols {
            let x0 = tx * grid.tile_w;
            let y0 = ty * grid.tile_h;
            let x1 = (x0 + grid.tile_w).min(width);
            let y1 = (y0 + grid.tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[image.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            clip_histogram(&mut hist, clip_limit, area);
            luts.push(cumulative_lut(&hist, area));
        }
    }
    luts
}

fn clip_histogram(hist: &mut [u32; 256], clip_limit: f64, area: u32) {
    let limit = ((clip_limit * area as f64 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let per_bin = excess / 256;
    let remainder = (excess % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if remainder > 0 {
        let step = (256 / remainder).max(1);
        for bin in hist.iter_mut().step_by(step).take(remainder) {
            *bin += 1;
        }
    }
}

fn cumulative_lut(hist: &[u32; 256], area: u32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let scale = 255.0 / area.max(1) as f32;
    let mut sum = 0u32;
    for (value, &count) in hist.iter().enumerate() {
        sum += count;
        lut[value] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
