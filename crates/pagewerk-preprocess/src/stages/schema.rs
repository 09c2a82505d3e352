// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-stage parameter schema: names, types, ranges and defaults.

use pagewerk_core::{ParamValue, PipelineError, Result, StageConfig, StageId};

/// Declared type and valid range of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Int { min: i64, max: i64, odd: bool },
    Float { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
}

const fn int(name: &'static str, min: i64, max: i64, odd: bool, default: i64) -> ParamSpec {
    ParamSpec {
        name,
        kind: ParamKind::Int { min, max, odd },
        default: ParamValue::Int(default),
    }
}

const fn float(name: &'static str, min: f64, max: f64, default: f64) -> ParamSpec {
    ParamSpec {
        name,
        kind: ParamKind::Float { min, max },
        default: ParamValue::Float(default),
    }
}

const SHADOW_REMOVAL: &[ParamSpec] = &[int("morph_kernel", 15, 101, true, 31)];

const BACKGROUND_NORMALIZATION: &[ParamSpec] = &[
    int("blur_ksize", 15, 201, true, 51),
    float("epsilon", 0.0001, 1.0, 0.001),
];

const GAUSSIAN_BLUR: &[ParamSpec] = &[
    int("kernel_size", 3, 21, true, 5),
    float("sigma", 0.1, 5.0, 1.0),
];

const CLAHE: &[ParamSpec] = &[
    float("clip_limit", 1.0, 10.0, 2.0),
    int("tile_grid_size", 4, 16, false, 8),
];

const SHARPEN: &[ParamSpec] = &[
    float("strength", 0.0, 2.0, 0.5),
    int("gaussian_ksize", 3, 21, true, 3),
    float("gaussian_sigma", 0.1, 5.0, 0.8),
];

const ADAPTIVE_THRESHOLD: &[ParamSpec] = &[
    int("block_size", 11, 101, true, 31),
    int("c", -20, 20, false, 5),
];

/// Parameters accepted by `stage`.
pub fn schema(stage: StageId) -> &'static [ParamSpec] {
    match stage {
        StageId::ShadowRemoval => SHADOW_REMOVAL,
        StageId::BackgroundNormalization => BACKGROUND_NORMALIZATION,
        StageId::GaussianBlur => GAUSSIAN_BLUR,
        StageId::Clahe => CLAHE,
        StageId::Sharpen => SHARPEN,
        StageId::AdaptiveThreshold => ADAPTIVE_THRESHOLD,
    }
}

pub fn spec(stage: StageId, field: &str) -> Option<&'static ParamSpec> {
    schema(stage).iter().find(|p| p.name == field)
}

/// Check one value against its declared spec.
pub fn check_value(stage: StageId, field: &str, value: ParamValue) -> Result<()> {
    let spec = spec(stage, field).ok_or_else(|| {
        PipelineError::invalid_parameter(stage.as_str(), field, "unknown parameter")
    })?;
    let invalid = |reason: String| PipelineError::invalid_parameter(stage.as_str(), field, reason);

    match spec.kind {
        ParamKind::Int { min, max, odd } => {
            let v = value.as_int().ok_or_else(|| {
                invalid(format!("expected int, got {}", value.type_name()))
            })?;
            if !(min..=max).contains(&v) {
                return Err(invalid(format!("{v} outside {min}..={max}")));
            }
            if odd && v % 2 == 0 {
                return Err(invalid(format!("{v} must be odd")));
            }
        }
        ParamKind::Float { min, max } => {
            let v = value.as_float().ok_or_else(|| {
                invalid(format!("expected float, got {}", value.type_name()))
            })?;
            if !v.is_finite() || v < min || v > max {
                return Err(invalid(format!("{v} outside {min}..={max}")));
            }
        }
    }
    Ok(())
}

/// Validate every parameter present in `config`. Absent parameters take
/// their schema defaults and are always valid.
pub fn validate(config: &StageConfig) -> Result<()> {
    for (field, value) in &config.params {
        check_value(config.id, field, *value)?;
    }
    Ok(())
}

/// Fully populated copy of `config`, with defaults for absent parameters.
pub fn with_defaults(config: &StageConfig) -> StageConfig {
    let mut full = config.clone();
    for spec in schema(config.id) {
        full.params.entry(spec.name.to_string()).or_insert(spec.default);
    }
    full
}

// -- Typed accessors used by stage implementations -----------------------------

pub(crate) fn int_param(config: &StageConfig, field: &str) -> Result<i64> {
    let value = lookup(config, field)?;
    value.as_int().ok_or_else(|| {
        PipelineError::invalid_parameter(config.id.as_str(), field, "expected int")
    })
}

pub(crate) fn float_param(config: &StageConfig, field: &str) -> Result<f64> {
    let value = lookup(config, field)?;
    value.as_float().ok_or_else(|| {
        PipelineError::invalid_parameter(config.id.as_str(), field, "expected float")
    })
}

fn lookup(config: &StageConfig, field: &str) -> Result<ParamValue> {
    match config.param(field) {
        Some(value) => Ok(value),
        None => spec(config.id, field).map(|s| s.default).ok_or_else(|| {
            PipelineError::invalid_parameter(config.id.as_str(), field, "unknown parameter")
        }),
    }
}
