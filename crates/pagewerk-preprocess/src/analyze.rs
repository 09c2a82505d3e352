// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page analyser — cheap quality measurements that drive automatic profile
// selection.

use image::GrayImage;
use imageproc::filter::laplacian_filter;
use pagewerk_core::PageMetadata;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::stages::ops::gaussian_blur;

/// Pages with a long side under this many pixels are treated as screen-resolution.
pub const LOW_RES_LONG_SIDE: u32 = 1500;
pub const DEFAULT_OCR_DPI: u32 = 300;
pub const LOW_RES_OCR_DPI: u32 = 96;

/// Fraction of near-black plus near-white pixels above which a page counts
/// as already binarised.
const BINARY_FRACTION: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageDiagnostics {
    pub width_px: u32,
    pub height_px: u32,
    pub long_side_px: u32,
    pub looks_binary: bool,
    /// Variance of the Laplacian; sharp text scores high.
    pub blur_score: f64,
    /// Standard deviation of |page - 3x3 gaussian(page)|.
    pub noise_score: f64,
    /// Standard deviation of a 51x51 gaussian of the page.
    pub background_variance: f64,
    pub suggested_ocr_dpi: u32,
}

impl ImageDiagnostics {
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn analyze(gray: &GrayImage) -> Self {
        let (width_px, height_px) = gray.dimensions();
        let long_side_px = width_px.max(height_px);
        if width_px == 0 || height_px == 0 {
            return Self {
                width_px,
                height_px,
                long_side_px,
                looks_binary: false,
                blur_score: 0.0,
                noise_score: 0.0,
                background_variance: 0.0,
                suggested_ocr_dpi: suggested_dpi(long_side_px),
            };
        }

        let laplacian = laplacian_filter(gray);
        let (_, lap_std) = mean_std(laplacian.as_raw().iter().map(|&v| v as f64));

        let blurred = gaussian_blur(gray, 3, 0.0);
        let residual = gray
            .as_raw()
            .iter()
            .zip(blurred.as_raw())
            .map(|(&a, &b)| a.abs_diff(b) as f64);
        let (_, noise_score) = mean_std(residual);

        let background = gaussian_blur(gray, 51, 0.0);
        let (_, background_variance) =
            mean_std(background.as_raw().iter().map(|&v| v as f64));

        let diagnostics = Self {
            width_px,
            height_px,
            long_side_px,
            looks_binary: looks_binary(gray),
            blur_score: lap_std * lap_std,
            noise_score,
            background_variance,
            suggested_ocr_dpi: suggested_dpi(long_side_px),
        };
        debug!(
            blur = diagnostics.blur_score,
            noise = diagnostics.noise_score,
            background = diagnostics.background_variance,
            binary = diagnostics.looks_binary,
            dpi = diagnostics.suggested_ocr_dpi,
            "Page analysed"
        );
        diagnostics
    }

    /// Fill the measured fields of `metadata` that the host left empty.
    pub fn merge_into(&self, metadata: &mut PageMetadata) {
        metadata.blur_score.get_or_insert(self.blur_score);
        metadata.noise_score.get_or_insert(self.noise_score);
        metadata
            .background_variance
            .get_or_insert(self.background_variance);
        metadata.long_side_px.get_or_insert(self.long_side_px);
        metadata.looks_binary.get_or_insert(self.looks_binary);
    }
}

/// OCR resolution to assume for a page of this size.
pub fn suggested_dpi(long_side_px: u32) -> u32 {
    if long_side_px > 0 && long_side_px < LOW_RES_LONG_SIDE {
        LOW_RES_OCR_DPI
    } else {
        DEFAULT_OCR_DPI
    }
}

fn looks_binary(gray: &GrayImage) -> bool {
    let total = gray.as_raw().len().max(1) as f64;
    let extreme = gray
        .as_raw()
        .iter()
        .filter(|&&v| v <= 2 || v >= 253)
        .count() as f64;
    extreme / total > BINARY_FRACTION
}

fn mean_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut n, mut sum, mut sum_sq) = (0usize, 0.0f64, 0.0f64);
    for v in values {
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let variance = (sum_sq / n as f64 - mean * mean).max(0.0);
    (mean, variance.sqrt())
}
