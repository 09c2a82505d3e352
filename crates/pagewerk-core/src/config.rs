// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::types::{
    ControlLevel, DataModeSetting, ExecutionStrategy, LanguageCode, PreprocessingProfile,
    ProfileName, TypographySettings,
};

/// Default estimate of the peak memory one page occupies while in flight.
pub const DEFAULT_PAGE_BUFFER_BYTES: u64 = 48 * 1024 * 1024;

/// Persistent pipeline settings, as read from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub execution_strategy: ExecutionStrategy,
    pub data_mode: DataModeSetting,
    pub control_level: ControlLevel,
    /// Languages to run OCR in, in order of preference.
    pub active_languages: Vec<LanguageCode>,
    /// Profile to use for every page, or `Automatic` for per-page selection.
    pub preprocessing_profile: ProfileName,
    pub typography: TypographySettings,
    /// Upper bound on worker threads (unbounded when `None`).
    pub max_workers: Option<usize>,
    pub average_page_buffer_bytes: u64,
    /// Memory budget for a batch; probed available memory is used when unset.
    pub memory_budget_bytes: Option<u64>,
    /// Root for disk-assisted spill files; the system temp dir when unset.
    pub spill_root: Option<PathBuf>,
    /// User-edited profiles that override the built-ins or add new names.
    pub custom_profiles: Vec<PreprocessingProfile>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            execution_strategy: ExecutionStrategy::Automatic,
            data_mode: DataModeSetting::Automatic,
            control_level: ControlLevel::Standard,
            active_languages: vec![LanguageCode::new("eng")],
            preprocessing_profile: ProfileName::Automatic,
            typography: TypographySettings::default(),
            max_workers: None,
            average_page_buffer_bytes: DEFAULT_PAGE_BUFFER_BYTES,
            memory_budget_bytes: None,
            spill_root: None,
            custom_profiles: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            PipelineError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        info!(path = %path.display(), languages = config.active_languages.len(), "configuration loaded");
        Ok(config)
    }

    /// Persist as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Reject settings no run could honour.
    pub fn validate(&self) -> Result<()> {
        if self.active_languages.is_empty() {
            return Err(PipelineError::Config(
                "at least one active language is required".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for lang in &self.active_languages {
            if lang.as_str().trim().is_empty() {
                return Err(PipelineError::Config("empty language code".into()));
            }
            if !seen.insert(lang) {
                return Err(PipelineError::Config(format!(
                    "language {lang} listed twice"
                )));
            }
        }
        if self.max_workers == Some(0) {
            return Err(PipelineError::Config("max_workers must be at least 1".into()));
        }
        if self.average_page_buffer_bytes == 0 {
            return Err(PipelineError::Config(
                "average_page_buffer_bytes must be positive".into(),
            ));
        }
        if self.typography.font_size_pt <= 0.0 {
            return Err(PipelineError::Config("font size must be positive".into()));
        }

        let mut names = BTreeSet::new();
        for profile in &self.custom_profiles {
            if profile.name == ProfileName::Automatic {
                return Err(PipelineError::Config(
                    "\"automatic\" cannot be stored as a custom profile".into(),
                ));
            }
            if !names.insert(&profile.name) {
                return Err(PipelineError::Config(format!(
                    "custom profile {} defined twice",
                    profile.name
                )));
            }
        }
        if let ProfileName::Custom(name) = &self.preprocessing_profile {
            if !names.contains(&self.preprocessing_profile) {
                return Err(PipelineError::UnknownProfile(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.active_languages, vec![LanguageCode::new("eng")]);
        assert_eq!(config.preprocessing_profile, ProfileName::Automatic);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagewerk.json");
        let mut config = PipelineConfig::default();
        config.execution_strategy = ExecutionStrategy::Sequential;
        config.active_languages = vec![LanguageCode::new("deu"), LanguageCode::new("eng")];
        config.max_workers = Some(2);
        config.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.execution_strategy, ExecutionStrategy::Sequential);
        assert_eq!(loaded.active_languages.len(), 2);
        assert_eq!(loaded.max_workers, Some(2));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "preprocessing_profile": "scanner" }"#).unwrap();
        assert_eq!(config.preprocessing_profile, ProfileName::Scanner);
        assert_eq!(config.average_page_buffer_bytes, DEFAULT_PAGE_BUFFER_BYTES);
    }

    #[test]
    fn rejects_empty_languages_and_zero_workers() {
        let mut config = PipelineConfig::default();
        config.active_languages.clear();
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));

        let mut config = PipelineConfig::default();
        config.max_workers = Some(0);
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn unknown_custom_selection_is_rejected() {
        let mut config = PipelineConfig::default();
        config.preprocessing_profile = ProfileName::Custom("receipts".into());
        assert!(matches!(
            config.validate(),
            Err(PipelineError::UnknownProfile(name)) if name == "receipts"
        ));
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
