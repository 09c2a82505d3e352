// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background normalisation — divides the page by a heavily blurred copy of
// itself, scaled by the mean background level, to even out illumination.

use image::GrayImage;
use pagewerk_core::{Result, StageConfig};
use tracing::debug;

use super::ops::{gaussian_blur, mean, minmax_to_gray};
use super::schema::{float_param, int_param};

pub(crate) fn normalize_background(image: &GrayImage, config: &StageConfig) -> Result<GrayImage> {
    let ksize = int_param(config, "blur_ksize")? as u32;
    let epsilon = float_param(config, "epsilon")? as f32;

    let background = gaussian_blur(image, ksize, 0.0);
    let bg_mean = mean(&background) as f32;

    let values: Vec<f32> = image
        .as_raw()
        .iter()
        .zip(background.as_raw())
        .map(|(&src, &bg)| src as f32 * bg_mean / (bg as f32 + epsilon))
        .collect();

    debug!(ksize, bg_mean, "Background normalised");
    Ok(minmax_to_gray(image.width(), image.height(), &values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use pagewerk_core::{ParamValue, StageId};

    #[test]
    fn evens_out_illumination() {
        // Brightness ramps from 120 to 219; a dark stroke sits in the middle.
        let mut img = GrayImage::from_fn(100, 20, |x, _| Luma([120 + x as u8]));
        for y in 0..20 {
            img.put_pixel(50, y, Luma([20]));
        }
        let config = StageConfig::new(StageId::BackgroundNormalization, true)
            .with("blur_ksize", ParamValue::Int(15));
        let out = normalize_background(&img, &config).unwrap();

        let left = out.get_pixel(30, 10).0[0];
        let right = out.get_pixel(70, 10).0[0];
        assert!(left.abs_diff(right) < 15, "{left} vs {right}");
        assert!(out.get_pixel(50, 10).0[0] < left.min(right));
    }

    #[test]
    fn flat_page_stays_flat() {
        let img = GrayImage::from_pixel(30, 30, Luma([200]));
        let config = StageConfig::new(StageId::BackgroundNormalization, true);
        let out = normalize_background(&img, &config).unwrap();
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }
}
