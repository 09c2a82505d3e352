// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Profile resolver — maps a page and a selection mode to the concrete
// profile it will be preprocessed with, and owns user overrides.

use std::collections::BTreeMap;

use pagewerk_core::{
    ControlLevel, PageMetadata, ParamValue, PipelineError, PreprocessingProfile, ProfileName,
    QualityHint, Result, SourceHint, StageId,
};
use tracing::{debug, info, instrument, warn};

use super::builtin::built_in;
use crate::stages::{check_order, check_value, validate};

/// How a profile is chosen for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveMode {
    /// Always use this profile.
    Manual(ProfileName),
    /// Pick a built-in per page from its metadata.
    Automatic,
}

impl From<ProfileName> for ResolveMode {
    fn from(name: ProfileName) -> Self {
        match name {
            ProfileName::Automatic => Self::Automatic,
            other => Self::Manual(other),
        }
    }
}

// -- Automatic selection -------------------------------------------------------

const HINT_WEIGHT: u32 = 2;
const RULE_WEIGHT: u32 = 1;

/// Deterministically choose a built-in profile from page metadata.
///
/// Host hints weigh twice as much as measured diagnostics. Ties go
/// `Scanner`, then `MobilePhoto`, then `LowQuality`; a page with no
/// information at all is treated as a scan.
pub fn select_automatic(meta: &PageMetadata) -> ProfileName {
    let (mut scanner, mut mobile, mut low) = (0u32, 0u32, 0u32);

    match meta.source_hint {
        Some(SourceHint::Scanner) => scanner += HINT_WEIGHT,
        Some(SourceHint::Camera) => mobile += HINT_WEIGHT,
        Some(SourceHint::Unknown) | None => {}
    }
    match meta.quality_hint {
        Some(QualityHint::Poor) => low += HINT_WEIGHT,
        Some(QualityHint::Good) => scanner += RULE_WEIGHT,
        None => {}
    }

    let blur = meta.blur_score;
    let noise = meta.noise_score;
    let background = meta.background_variance;
    let long_side = meta.long_side_px;

    if meta.looks_binary == Some(true) {
        scanner += RULE_WEIGHT;
    }
    // Large, sharp, flat and quiet: a clean high-resolution scan.
    if long_side.is_some_and(|v| v > 3000)
        && blur.is_some_and(|v| v > 150.0)
        && background.is_some_and(|v| v < 10.0)
        && noise.is_some_and(|v| v < 20.0)
    {
        scanner += RULE_WEIGHT;
    }
    // Uneven illumination on an otherwise sharp, quiet page: a phone photo.
    if background.is_some_and(|v| v > 30.0)
        && noise.is_some_and(|v| v < 35.0)
        && blur.is_some_and(|v| v > 80.0)
    {
        mobile += RULE_WEIGHT;
    }
    if blur.is_some_and(|v| v < 80.0)
        || noise.is_some_and(|v| v > 40.0)
        || long_side.is_some_and(|v| v < 1500)
    {
        low += RULE_WEIGHT;
    }

    let choice = if scanner >= mobile && scanner >= low {
        ProfileName::Scanner
    } else if mobile >= low {
        ProfileName::MobilePhoto
    } else {
        ProfileName::LowQuality
    };
    debug!(scanner, mobile, low, %choice, "Automatic profile selection");
    choice
}

// -- Resolver ------------------------------------------------------------------

/// Owns the active control level and user-edited profiles.
#[derive(Debug, Clone)]
pub struct ProfileResolver {
    control: ControlLevel,
    overrides: BTreeMap<ProfileName, PreprocessingProfile>,
}

impl ProfileResolver {
    pub fn new(control: ControlLevel) -> Self {
        Self {
            control,
            overrides: BTreeMap::new(),
        }
    }

    /// Build a resolver seeded with stored overrides (typically from
    /// `PipelineConfig::custom_profiles`). Each one is normalised and
    /// validated; a bad stored profile is an error, not silently dropped.
    pub fn with_overrides(
        control: ControlLevel,
        profiles: impl IntoIterator<Item = PreprocessingProfile>,
    ) -> Result<Self> {
        let mut resolver = Self::new(control);
        for profile in profiles {
            let profile = normalise(profile)?;
            resolver.overrides.insert(profile.name.clone(), profile);
        }
        info!(overrides = resolver.overrides.len(), ?control, "Profile resolver ready");
        Ok(resolver)
    }

    pub fn control_level(&self) -> ControlLevel {
        self.control
    }

    pub fn set_control_level(&mut self, control: ControlLevel) {
        self.control = control;
    }

    /// Stored overrides, for persisting back into configuration.
    pub fn overrides(&self) -> impl Iterator<Item = &PreprocessingProfile> {
        self.overrides.values()
    }

    /// The profile a page with `meta` will be processed with.
    #[instrument(skip(self, meta))]
    pub fn resolve(&self, meta: &PageMetadata, mode: &ResolveMode) -> Result<PreprocessingProfile> {
        let name = match mode {
            ResolveMode::Manual(ProfileName::Automatic) | ResolveMode::Automatic => {
                select_automatic(meta)
            }
            ResolveMode::Manual(name) => name.clone(),
        };
        self.lookup(&name)
    }

    /// Current profile stored under `name`: the override if one exists,
    /// otherwise the factory default.
    pub fn lookup(&self, name: &ProfileName) -> Result<PreprocessingProfile> {
        match self.overrides.get(name) {
            Some(profile) => Ok(profile.clone()),
            None => built_in(name),
        }
    }

    /// Discard any override for a built-in and return its factory default.
    pub fn reset(&mut self, name: &ProfileName) -> Result<PreprocessingProfile> {
        let default = built_in(name)?;
        if self.overrides.remove(name).is_some() {
            info!(%name, "Profile override discarded");
        }
        Ok(default)
    }

    /// Change one parameter of one stage. Professional control only.
    pub fn edit_parameter(
        &mut self,
        name: &ProfileName,
        stage: StageId,
        field: &str,
        value: ParamValue,
    ) -> Result<PreprocessingProfile> {
        self.require_professional(name)?;
        check_value(stage, field, value)?;
        self.commit_edit(name, |profile| {
            if let Some(config) = profile.stage_mut(stage) {
                config.params.insert(field.to_string(), value);
            }
        })
    }

    /// Turn a stage on or off. Professional control only.
    pub fn set_stage_enabled(
        &mut self,
        name: &ProfileName,
        stage: StageId,
        enabled: bool,
    ) -> Result<PreprocessingProfile> {
        self.require_professional(name)?;
        self.commit_edit(name, |profile| {
            if let Some(config) = profile.stage_mut(stage) {
                config.enabled = enabled;
            }
        })
    }

    /// Store a complete profile (for example a new custom one) as an
    /// override. Professional control only.
    pub fn save_override(&mut self, profile: PreprocessingProfile) -> Result<PreprocessingProfile> {
        self.require_professional(&profile.name)?;
        let profile = normalise(profile)?;
        info!(name = %profile.name, version = profile.version, "Profile override saved");
        self.overrides.insert(profile.name.clone(), profile.clone());
        Ok(profile)
    }

    fn require_professional(&self, name: &ProfileName) -> Result<()> {
        if self.control != ControlLevel::Professional {
            warn!(%name, "Profile edit refused under standard control");
            return Err(PipelineError::ControlLevelViolation {
                profile: name.to_string(),
            });
        }
        if *name == ProfileName::Automatic {
            return Err(PipelineError::UnknownProfile(name.to_string()));
        }
        Ok(())
    }

    fn commit_edit(
        &mut self,
        name: &ProfileName,
        edit: impl FnOnce(&mut PreprocessingProfile),
    ) -> Result<PreprocessingProfile> {
        let mut candidate = self.lookup(name)?;
        edit(&mut candidate);
        candidate.version += 1;
        for stage in &candidate.stages {
            validate(stage)?;
        }
        debug!(%name, version = candidate.version, "Profile edited");
        self.overrides.insert(name.clone(), candidate.clone());
        Ok(candidate)
    }
}

fn normalise(profile: PreprocessingProfile) -> Result<PreprocessingProfile> {
    if profile.name == ProfileName::Automatic {
        return Err(PipelineError::UnknownProfile(profile.name.to_string()));
    }
    let mut sorted = profile.stages.clone();
    sorted.sort_by_key(|s| s.id);
    check_order(&sorted)?;
    let profile = PreprocessingProfile::from_stages(profile.name, profile.version, sorted)?;
    for stage in &profile.stages {
        validate(stage)?;
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewerk_core::StageConfig;

    fn professional() -> ProfileResolver {
        ProfileResolver::new(ControlLevel::Professional)
    }

    #[test]
    fn manual_returns_built_in_default() {
        let resolver = ProfileResolver::new(ControlLevel::Standard);
        let profile = resolver
            .resolve(&PageMetadata::default(), &ResolveMode::Manual(ProfileName::MobilePhoto))
            .unwrap();
        assert_eq!(profile, built_in(&ProfileName::MobilePhoto).unwrap());
    }

    #[test]
    fn unknown_custom_name_fails() {
        let resolver = ProfileResolver::new(ControlLevel::Standard);
        let err = resolver
            .resolve(
                &PageMetadata::default(),
                &ResolveMode::Manual(ProfileName::Custom("receipts".into())),
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownProfile(n) if n == "receipts"));
    }

    #[test]
    fn empty_metadata_resolves_to_scanner() {
        assert_eq!(select_automatic(&PageMetadata::default()), ProfileName::Scanner);
    }

    #[test]
    fn camera_hint_selects_mobile() {
        let meta = PageMetadata {
            source_hint: Some(SourceHint::Camera),
            ..Default::default()
        };
        assert_eq!(select_automatic(&meta), ProfileName::MobilePhoto);
    }

    #[test]
    fn poor_quality_hint_beats_diagnostics() {
        let meta = PageMetadata {
            quality_hint: Some(QualityHint::Poor),
            background_variance: Some(45.0),
            noise_score: Some(10.0),
            blur_score: Some(300.0),
            ..Default::default()
        };
        assert_eq!(select_automatic(&meta), ProfileName::LowQuality);
    }

    #[test]
    fn uneven_illumination_selects_mobile() {
        let meta = PageMetadata {
            background_variance: Some(45.0),
            noise_score: Some(10.0),
            blur_score: Some(300.0),
            long_side_px: Some(2400),
            ..Default::default()
        };
        assert_eq!(select_automatic(&meta), ProfileName::MobilePhoto);
    }

    #[test]
    fn blurry_page_selects_low_quality() {
        let meta = PageMetadata {
            blur_score: Some(20.0),
            long_side_px: Some(2400),
            ..Default::default()
        };
        assert_eq!(select_automatic(&meta), ProfileName::LowQuality);
    }

    #[test]
    fn mobile_and_low_quality_tie_goes_to_mobile() {
        // Uneven but small: both rules fire once.
        let meta = PageMetadata {
            background_variance: Some(45.0),
            noise_score: Some(10.0),
            blur_score: Some(300.0),
            long_side_px: Some(1000),
            ..Default::default()
        };
        assert_eq!(select_automatic(&meta), ProfileName::MobilePhoto);
    }

    #[test]
    fn selection_is_deterministic() {
        let meta = PageMetadata {
            source_hint: Some(SourceHint::Camera),
            quality_hint: Some(QualityHint::Poor),
            ..Default::default()
        };
        let first = select_automatic(&meta);
        for _ in 0..10 {
            assert_eq!(select_automatic(&meta), first);
        }
        // Camera and poor tie at 2; mobile wins the tie.
        assert_eq!(first, ProfileName::MobilePhoto);
    }

    #[test]
    fn standard_control_refuses_edits_and_keeps_state() {
        let mut resolver = ProfileResolver::new(ControlLevel::Standard);
        let before = resolver.lookup(&ProfileName::Scanner).unwrap();
        let err = resolver
            .edit_parameter(&ProfileName::Scanner, StageId::Clahe, "clip_limit", ParamValue::Float(3.0))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ControlLevelViolation { .. }));
        assert!(resolver
            .set_stage_enabled(&ProfileName::Scanner, StageId::Clahe, true)
            .is_err());
        assert_eq!(resolver.lookup(&ProfileName::Scanner).unwrap(), before);
    }

    #[test]
    fn professional_edit_bumps_version_and_is_resolved() {
        let mut resolver = professional();
        let edited = resolver
            .edit_parameter(&ProfileName::Scanner, StageId::Clahe, "clip_limit", ParamValue::Float(3.5))
            .unwrap();
        assert_eq!(edited.version, 2);
        let resolved = resolver
            .resolve(&PageMetadata::default(), &ResolveMode::Manual(ProfileName::Scanner))
            .unwrap();
        assert_eq!(
            resolved.stage(StageId::Clahe).unwrap().param("clip_limit"),
            Some(ParamValue::Float(3.5))
        );
    }

    #[test]
    fn invalid_edit_leaves_profile_unchanged() {
        let mut resolver = professional();
        let err = resolver
            .edit_parameter(&ProfileName::MobilePhoto, StageId::GaussianBlur, "kernel_size", ParamValue::Int(4))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));
        assert_eq!(
            resolver.lookup(&ProfileName::MobilePhoto).unwrap(),
            built_in(&ProfileName::MobilePhoto).unwrap()
        );
    }

    #[test]
    fn reset_discards_override() {
        let mut resolver = professional();
        resolver
            .set_stage_enabled(&ProfileName::Scanner, StageId::AdaptiveThreshold, true)
            .unwrap();
        let reset = resolver.reset(&ProfileName::Scanner).unwrap();
        assert_eq!(reset, built_in(&ProfileName::Scanner).unwrap());
        assert_eq!(resolver.lookup(&ProfileName::Scanner).unwrap(), reset);
    }

    #[test]
    fn custom_profile_round_trip() {
        let mut resolver = professional();
        let name = ProfileName::Custom("receipts".into());
        let saved = resolver
            .save_override(PreprocessingProfile {
                name: name.clone(),
                version: 1,
                stages: vec![
                    StageConfig::new(StageId::AdaptiveThreshold, true),
                    StageConfig::new(StageId::GaussianBlur, true),
                ],
            })
            .unwrap();
        assert!(saved.is_canonical());
        let resolved = resolver
            .resolve(&PageMetadata::default(), &ResolveMode::from(name.clone()))
            .unwrap();
        assert_eq!(resolved.enabled_stages().count(), 2);
        assert_eq!(resolver.overrides().count(), 1);
        // Custom names have no factory default to reset to.
        assert!(matches!(resolver.reset(&name), Err(PipelineError::UnknownProfile(_))));
    }

    #[test]
    fn stored_overrides_are_validated() {
        let bad = PreprocessingProfile {
            name: ProfileName::Scanner,
            version: 3,
            stages: vec![StageConfig::new(StageId::Clahe, true)
                .with("clip_limit", ParamValue::Float(50.0))],
        };
        assert!(ProfileResolver::with_overrides(ControlLevel::Standard, vec![bad]).is_err());
    }
}
