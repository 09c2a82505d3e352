// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Everything a batch run needs besides the document and the plan.

use pagewerk_core::{
    CancelToken, ControlLevel, LanguageCode, PipelineConfig, PressureSignal, Result,
};
use pagewerk_preprocess::{ProfileResolver, ResolveMode};
use uuid::Uuid;

/// Per-run state passed explicitly to the scheduler.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub mode: ResolveMode,
    pub resolver: ProfileResolver,
    /// OCR languages in preference order.
    pub languages: Vec<LanguageCode>,
    pub cancel: CancelToken,
    pub pressure: PressureSignal,
    pub run_id: Uuid,
}

impl ExecutionContext {
    pub fn new(mode: ResolveMode, resolver: ProfileResolver, languages: Vec<LanguageCode>) -> Self {
        Self {
            mode,
            resolver,
            languages,
            cancel: CancelToken::new(),
            pressure: PressureSignal::new(),
            run_id: Uuid::new_v4(),
        }
    }

    /// Build from a validated configuration; stored custom profiles become
    /// resolver overrides.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let resolver =
            ProfileResolver::with_overrides(config.control_level, config.custom_profiles.clone())?;
        Ok(Self::new(
            ResolveMode::from(config.preprocessing_profile.clone()),
            resolver,
            config.active_languages.clone(),
        ))
    }

    /// Share a cancel token owned by the host.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Share a memory-pressure signal owned by the host.
    pub fn with_pressure(mut self, pressure: PressureSignal) -> Self {
        self.pressure = pressure;
        self
    }

    pub fn control_level(&self) -> ControlLevel {
        self.resolver.control_level()
    }
}
