// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unsharp mask: out = src + strength * (src - blur(src)).

use image::GrayImage;
use pagewerk_core::{Result, StageConfig};

use super::ops::gaussian_blur;
use super::schema::{float_param, int_param};

pub(crate) fn unsharp_mask(image: &GrayImage, config: &StageConfig) -> Result<GrayImage> {
    let strength = float_param(config, "strength")? as f32;
    let ksize = int_param(config, "gaussian_ksize")? as u32;
    let sigma = float_param(config, "gaussian_sigma")?;

    if strength <= 0.0 {
        return Ok(image.clone());
    }

    let blurred = gaussian_blur(image, ksize, sigma);
    let pixels: Vec<u8> = image
        .as_raw()
        .iter()
        .zip(blurred.as_raw())
        .map(|(&src, &blur)| {
            let src = src as f32;
            (src + strength * (src - blur as f32)).round().clamp(0.0, 255.0) as u8
        })
        .collect();

    Ok(GrayImage::from_raw(image.width(), image.height(), pixels)
        .unwrap_or_else(|| image.clone()))
}
