// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stage library — the six preprocessing transforms and the ordered runner.
//
// Every stage is a pure function over an 8-bit grayscale buffer. A disabled
// stage hands its input back untouched. Parameters are checked against the
// schema in `schema` before any pixel is touched.

mod background;
mod clahe;
mod denoise;
pub(crate) mod ops;
pub mod schema;
mod shadow;
mod sharpen;
mod threshold;

use image::GrayImage;
use pagewerk_core::{PipelineError, Result, StageConfig, StageId};
use tracing::{debug, instrument};

pub use schema::{ParamKind, ParamSpec, check_value, validate, with_defaults};

/// Apply one stage.
pub fn apply(image: GrayImage, config: &StageConfig) -> Result<GrayImage> {
    if !config.enabled {
        return Ok(image);
    }
    validate(config)?;
    dispatch(&image, config)
}

fn dispatch(image: &GrayImage, config: &StageConfig) -> Result<GrayImage> {
    match config.id {
        StageId::ShadowRemoval => shadow::remove_shadows(image, config),
        StageId::BackgroundNormalization => background::normalize_background(image, config),
        StageId::GaussianBlur => denoise::reduce_noise(image, config),
        StageId::Clahe => clahe::equalize(image, config),
        StageId::Sharpen => sharpen::unsharp_mask(image, config),
        StageId::AdaptiveThreshold => threshold::adaptive_threshold(image, config),
    }
}

/// Reject lists that are out of canonical order or name a stage twice.
pub fn check_order(stages: &[StageConfig]) -> Result<()> {
    for pair in stages.windows(2) {
        let (prev, next) = (pair[0].id, pair[1].id);
        if next <= prev {
            return Err(PipelineError::StageOrder(format!(
                "{next} may not follow {prev}"
            )));
        }
    }
    Ok(())
}

/// Run a profile's stage list in order.
pub fn run_stages(image: GrayImage, stages: &[StageConfig]) -> Result<GrayImage> {
    run_stages_cancellable(image, stages, &|| false)
}

/// Like [`run_stages`], but asks `should_stop` before each stage and fails
/// with `Cancelled` when it answers yes. A stage that has started always
/// completes.
#[instrument(skip_all, fields(width = image.width(), height = image.height(), stages = stages.len()))]
pub fn run_stages_cancellable(
    image: GrayImage,
    stages: &[StageConfig],
    should_stop: &dyn Fn() -> bool,
) -> Result<GrayImage> {
    check_order(stages)?;
    for stage in stages.iter().filter(|s| s.enabled) {
        validate(stage)?;
    }

    let mut current = image;
    for stage in stages {
        if should_stop() {
            debug!(stage = %stage.id, "Cancelled before stage");
            return Err(PipelineError::Cancelled);
        }
        if !stage.enabled {
            continue;
        }
        current = dispatch(&current, stage)?;
        debug!(stage = %stage.id, "Stage complete");
    }
    Ok(current)
}
