// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in preprocessing profiles.

use pagewerk_core::{
    ParamValue::{Float, Int},
    PipelineError, PreprocessingProfile, ProfileName, Result, StageConfig, StageId,
};

/// Version number of every untouched built-in.
pub const BUILT_IN_VERSION: u32 = 1;

/// The factory default for a built-in name.
pub fn built_in(name: &ProfileName) -> Result<PreprocessingProfile> {
    let stages = match name {
        ProfileName::MobilePhoto => mobile_photo(),
        ProfileName::Scanner => scanner(),
        ProfileName::LowQuality => low_quality(),
        other => return Err(PipelineError::UnknownProfile(other.to_string())),
    };
    Ok(PreprocessingProfile {
        name: name.clone(),
        version: BUILT_IN_VERSION,
        stages,
    })
}

/// Phone photos: uneven light and shadows, so everything is on.
fn mobile_photo() -> Vec<StageConfig> {
    vec![
        StageConfig::new(StageId::ShadowRemoval, true).with("morph_kernel", Int(31)),
        StageConfig::new(StageId::BackgroundNormalization, true)
            .with("blur_ksize", Int(51))
            .with("epsilon", Float(0.001)),
        StageConfig::new(StageId::GaussianBlur, true)
            .with("kernel_size", Int(5))
            .with("sigma", Float(1.0)),
        StageConfig::new(StageId::Clahe, true)
            .with("clip_limit", Float(2.0))
            .with("tile_grid_size", Int(8)),
        StageConfig::new(StageId::Sharpen, true)
            .with("strength", Float(0.5))
            .with("gaussian_ksize", Int(3))
            .with("gaussian_sigma", Float(0.8)),
        StageConfig::new(StageId::AdaptiveThreshold, true)
            .with("block_size", Int(31))
            .with("c", Int(5)),
    ]
}

/// Flatbed scans are already clean; only a gentle background pass and a
/// light blur.
fn scanner() -> Vec<StageConfig> {
    vec![
        StageConfig::new(StageId::ShadowRemoval, false).with("morph_kernel", Int(31)),
        StageConfig::new(StageId::BackgroundNormalization, true)
            .with("blur_ksize", Int(101))
            .with("epsilon", Float(0.01)),
        StageConfig::new(StageId::GaussianBlur, true)
            .with("kernel_size", Int(3))
            .with("sigma", Float(0.5)),
        StageConfig::new(StageId::Clahe, false)
            .with("clip_limit", Float(2.0))
            .with("tile_grid_size", Int(8)),
        StageConfig::new(StageId::Sharpen, false)
            .with("strength", Float(0.8))
            .with("gaussian_ksize", Int(3))
            .with("gaussian_sigma", Float(0.8)),
        StageConfig::new(StageId::AdaptiveThreshold, false)
            .with("block_size", Int(31))
            .with("c", Int(5)),
    ]
}

/// Blurry, noisy or tiny pages: stronger smoothing and contrast, softer
/// sharpening, no binarisation.
fn low_quality() -> Vec<StageConfig> {
    vec![
        StageConfig::new(StageId::ShadowRemoval, false).with("morph_kernel", Int(31)),
        StageConfig::new(StageId::BackgroundNormalization, true)
            .with("blur_ksize", Int(51))
            .with("epsilon", Float(0.001)),
        StageConfig::new(StageId::GaussianBlur, true)
            .with("kernel_size", Int(7))
            .with("sigma", Float(1.5)),
        StageConfig::new(StageId::Clahe, true)
            .with("clip_limit", Float(3.0))
            .with("tile_grid_size", Int(8)),
        StageConfig::new(StageId::Sharpen, true)
            .with("strength", Float(0.3))
            .with("gaussian_ksize", Int(3))
            .with("gaussian_sigma", Float(0.8)),
        StageConfig::new(StageId::AdaptiveThreshold, false)
            .with("block_size", Int(31))
            .with("c", Int(5)),
    ]
}
