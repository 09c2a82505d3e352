// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive threshold — local-mean binarisation over a summed-area table.

use image::{GrayImage, Luma};
use pagewerk_core::{Result, StageConfig};
use tracing::debug;

use super::ops::{compute_integral_image, region_mean};
use super::schema::int_param;

/// For each pixel the threshold is the mean of its `block_size` window minus
/// `c`. Pixels brighter than their threshold become white, the rest black.
pub(crate) fn adaptive_threshold(image: &GrayImage, config: &StageConfig) -> Result<GrayImage> {
    let block_size = int_param(config, "block_size")? as u32;
    let c = int_param(config, "c")? as f64;
    let radius = block_size / 2;

    let (width, height) = image.dimensions();
    let integral = compute_integral_image(image);
    let mut output = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let threshold = region_mean(&integral, width, height, x, y, radius) - c;
            let value = image.get_pixel(x, y).0[0] as f64;
            let binary = if value > threshold { 255u8 } else { 0u8 };
            output.put_pixel(x, y, Luma([binary]));
        }
    }

    debug!(block_size, c, "Adaptive threshold applied");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewerk_core::StageId;

    #[test]
    fn output_is_binary_and_keeps_text_dark() {
        let mut img = GrayImage::from_fn(60, 60, |x, _| Luma([150 + (x / 2) as u8]));
        for x in 20..40 {
            img.put_pixel(x, 30, Luma([40]));
        }
        let out = adaptive_threshold(&img, &StageConfig::new(StageId::AdaptiveThreshold, true))
            .unwrap();
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(out.get_pixel(30, 30).0[0], 0);
        assert_eq!(out.get_pixel(30, 10).0[0], 255);
    }
}
