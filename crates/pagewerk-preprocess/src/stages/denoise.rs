// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Noise reduction — plain gaussian blur with explicit kernel size and sigma.

use image::GrayImage;
use pagewerk_core::{Result, StageConfig};

use super::ops::gaussian_blur;
use super::schema::{float_param, int_param};

pub(crate) fn reduce_noise(image: &GrayImage, config: &StageConfig) -> Result<GrayImage> {
    let ksize = int_param(config, "kernel_size")? as u32;
    let sigma = float_param(config, "sigma")?;
    Ok(gaussian_blur(image, ksize, sigma))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use pagewerk_core::StageId;

    #[test]
    fn smooths_salt_noise() {
        let mut img = GrayImage::from_pixel(11, 11, Luma([100]));
        img.put_pixel(5, 5, Luma([255]));
        let out = reduce_noise(&img, &StageConfig::new(StageId::GaussianBlur, true)).unwrap();
        let peak = out.get_pixel(5, 5).0[0];
        assert!(peak < 200 && peak > 100);
        assert!(out.get_pixel(0, 0).0[0].abs_diff(100) <= 1);
    }
}
