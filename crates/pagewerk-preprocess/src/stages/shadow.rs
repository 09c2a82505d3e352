// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shadow removal — estimates the paper background with a morphological
// closing (which erases dark strokes narrower than the kernel) and keeps only
// the difference from it, so soft shadows and gradients disappear while ink
// stays dark.

use image::GrayImage;
use pagewerk_core::{Result, StageConfig};
use tracing::debug;

use super::ops::{dilate, erode, minmax_to_gray};
use super::schema::int_param;

pub(crate) fn remove_shadows(image: &GrayImage, config: &StageConfig) -> Result<GrayImage> {
    let kernel = int_param(config, "morph_kernel")? as u32;
    let background = erode(&dilate(image, kernel), kernel);

    let values: Vec<f32> = image
        .as_raw()
        .iter()
        .zip(background.as_raw())
        .map(|(&src, &bg)| 255.0 - (bg as f32 - src as f32).abs())
        .collect();

    debug!(kernel, "Shadow removal applied");
    Ok(minmax_to_gray(image.width(), image.height(), &values))
}
