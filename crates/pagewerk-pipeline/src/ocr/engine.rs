// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bundled OCR service built on the pure-Rust `ocrs` engine.
//
// # Feature Gate
//
// Only compiled with the `ocr` feature:
//
// ```toml
// pagewerk-pipeline = { path = "crates/pagewerk-pipeline", features = ["ocr"] }
// ```
//
// # Model Layout
//
// Each language needs a detection and a recognition model (`.rten`). A
// language-specific pair is looked up in `<model_dir>/<language>/`; the pair
// directly in `<model_dir>` serves the languages listed in
// `OcrsConfig::root_languages` (by default only `eng`, which is what the
// stock `ocrs-cli` download provides).
//
// The default model directory is `$XDG_CACHE_HOME/ocrs` (typically
// `~/.cache/ocrs`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use pagewerk_core::{LanguageCode, PipelineError, Result};
use rten::Model;
use tracing::{debug, info, instrument, warn};

use super::{OcrError, OcrService};

pub const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
pub const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find models.
#[derive(Debug, Clone)]
pub struct OcrsConfig {
    pub model_dir: PathBuf,
    /// Languages served by the model pair stored directly in `model_dir`.
    pub root_languages: Vec<LanguageCode>,
}

impl Default for OcrsConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrsConfig {
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            model_dir: dir.as_ref().to_path_buf(),
            root_languages: vec![LanguageCode::new("eng")],
        }
    }

    /// Directory holding the model pair for `language`, if one exists.
    pub fn models_for(&self, language: &LanguageCode) -> Option<PathBuf> {
        let specific = self.model_dir.join(language.as_str());
        if has_models(&specific) {
            return Some(specific);
        }
        if self.root_languages.contains(language) && has_models(&self.model_dir) {
            return Some(self.model_dir.clone());
        }
        None
    }
}

fn has_models(dir: &Path) -> bool {
    dir.join(DETECTION_MODEL_FILENAME).is_file() && dir.join(RECOGNITION_MODEL_FILENAME).is_file()
}

/// One loaded `ocrs` engine per language.
pub struct OcrsService {
    engines: BTreeMap<LanguageCode, OcrsEngine>,
}

impl OcrsService {
    /// Load models for each of `languages`. Languages without models are
    /// skipped with a warning and will report `UnsupportedLanguage`; it is an
    /// error only when none can be loaded.
    ///
    /// Model loading is the expensive step. The `ocrs` and `rten` crates must
    /// be built in release mode or recognition is very slow.
    #[instrument(skip_all, fields(model_dir = %config.model_dir.display(), languages = languages.len()))]
    pub fn load(config: &OcrsConfig, languages: &[LanguageCode]) -> Result<Self> {
        let mut engines = BTreeMap::new();
        for language in languages {
            let Some(dir) = config.models_for(language) else {
                warn!(%language, "No OCR models found for language");
                continue;
            };
            engines.insert(language.clone(), load_engine(&dir, language)?);
        }
        if engines.is_empty() {
            return Err(PipelineError::Config(format!(
                "no OCR models found under {}; run `ocrs-cli` once to download them",
                config.model_dir.display()
            )));
        }
        info!(loaded = engines.len(), "OCR engines initialised");
        Ok(Self { engines })
    }

    pub fn languages(&self) -> impl Iterator<Item = &LanguageCode> {
        self.engines.keys()
    }
}

fn load_engine(dir: &Path, language: &LanguageCode) -> Result<OcrsEngine> {
    let load = |file: &str| {
        let path = dir.join(file);
        Model::load_file(&path).map_err(|err| PipelineError::OcrFailure {
            language: language.to_string(),
            detail: format!("failed to load model {}: {}", path.display(), err),
        })
    };
    info!(%language, dir = %dir.display(), "Loading OCR models");
    let detection_model = load(DETECTION_MODEL_FILENAME)?;
    let recognition_model = load(RECOGNITION_MODEL_FILENAME)?;

    OcrsEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })
    .map_err(|err| PipelineError::OcrFailure {
        language: language.to_string(),
        detail: format!("failed to initialise OCR engine: {}", err),
    })
}

impl OcrService for OcrsService {
    fn recognize(&self, image: &GrayImage, language: &LanguageCode) -> std::result::Result<String, OcrError> {
        let engine = self
            .engines
            .get(language)
            .ok_or_else(|| OcrError::UnsupportedLanguage(language.clone()))?;

        let rgb = DynamicImage::ImageLuma8(image.clone()).to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            OcrError::Engine(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = engine
            .prepare_input(source)
            .map_err(|err| OcrError::Engine(format!("OCR preprocessing failed: {}", err)))?;
        let text = engine
            .get_text(&input)
            .map_err(|err| OcrError::Engine(format!("OCR text recognition failed: {}", err)))?;

        debug!(%language, lines = text.lines().count(), "OCR recognition complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch_models(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(DETECTION_MODEL_FILENAME), b"").unwrap();
        std::fs::write(dir.join(RECOGNITION_MODEL_FILENAME), b"").unwrap();
    }

    #[test]
    fn language_directory_wins_over_root() {
        let dir = tempfile::tempdir().unwrap();
        touch_models(dir.path());
        touch_models(&dir.path().join("eng"));
        let config = OcrsConfig::from_dir(dir.path());
        assert_eq!(
            config.models_for(&LanguageCode::new("eng")),
            Some(dir.path().join("eng"))
        );
    }

    #[test]
    fn root_models_serve_only_root_languages() {
        let dir = tempfile::tempdir().unwrap();
        touch_models(dir.path());
        let config = OcrsConfig::from_dir(dir.path());
        assert_eq!(
            config.models_for(&LanguageCode::new("eng")),
            Some(dir.path().to_path_buf())
        );
        assert_eq!(config.models_for(&LanguageCode::new("deu")), None);
    }

    #[test]
    fn load_without_models_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrsConfig::from_dir(dir.path());
        assert!(matches!(
            OcrsService::load(&config, &[LanguageCode::new("eng")]),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn default_dir_ends_with_ocrs() {
        let config = OcrsConfig::default();
        assert!(config.model_dir.ends_with("ocrs") || config.model_dir.ends_with("ocrs-models"));
    }
}
