// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR service boundary and the per-page recognition job.
//
// The recognition engine is a black box behind `OcrService`. A bundled
// implementation built on `ocrs` is available with the `ocr` feature.

#[cfg(feature = "ocr")]
pub mod engine;

use std::collections::BTreeMap;

use image::GrayImage;
use pagewerk_core::{
    LanguageCode, LanguageOutcome, PageError, PageId, PipelineError,
};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::retry::{RetryDecision, RetryPolicy, should_retry};

/// Failure reported by an OCR engine.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// The engine has no model for this language. Retrying cannot help.
    #[error("language {0} is not available")]
    UnsupportedLanguage(LanguageCode),
    /// Anything else the engine reported.
    #[error("{0}")]
    Engine(String),
}

/// A text recogniser. Implementations must be shareable across worker threads.
pub trait OcrService: Send + Sync {
    /// Recognise all text on a preprocessed page in one language. Lines are
    /// separated by `\n`; blank lines mark paragraph gaps.
    fn recognize(&self, image: &GrayImage, language: &LanguageCode) -> Result<String, OcrError>;
}

/// Recognition of one page in every active language.
#[derive(Debug)]
pub struct OcrJob {
    pub page_id: PageId,
    pub languages: Vec<LanguageCode>,
    pub outcomes: BTreeMap<LanguageCode, LanguageOutcome>,
}

impl OcrJob {
    pub fn new(page_id: PageId, languages: &[LanguageCode]) -> Self {
        Self {
            page_id,
            languages: languages.to_vec(),
            outcomes: BTreeMap::new(),
        }
    }

    /// Recognise `image` once per language, retrying failures according to
    /// `policy`. Languages are independent: one failing never stops another.
    #[instrument(skip_all, fields(page = self.page_id.0, languages = self.languages.len()))]
    pub fn run(&mut self, service: &dyn OcrService, image: &GrayImage, policy: &RetryPolicy) {
        for language in &self.languages {
            let mut attempt = 0u32;
            let outcome = loop {
                attempt += 1;
                match service.recognize(image, language) {
                    Ok(text) => {
                        debug!(%language, attempt, chars = text.len(), "Recognised");
                        break LanguageOutcome::Recognized {
                            text,
                            attempts: attempt,
                        };
                    }
                    Err(err) => match should_retry(&err, attempt, policy) {
                        RetryDecision::RetryNow => {
                            warn!(%language, attempt, error = %err, "OCR failed, retrying");
                        }
                        RetryDecision::GiveUp | RetryDecision::Exhausted => {
                            warn!(%language, attempt, error = %err, "OCR failed");
                            let failure = PipelineError::OcrFailure {
                                language: language.to_string(),
                                detail: err.to_string(),
                            };
                            break LanguageOutcome::Failed {
                                error: PageError::from(&failure),
                                attempts: attempt,
                            };
                        }
                    },
                }
            };
            self.outcomes.insert(language.clone(), outcome);
        }
    }

    /// Attempts spent on `language`; zero if it has not run yet.
    pub fn attempts(&self, language: &LanguageCode) -> u32 {
        self.outcomes.get(language).map_or(0, LanguageOutcome::attempts)
    }

    /// Whether at least one language produced text.
    pub fn any_succeeded(&self) -> bool {
        self.outcomes
            .values()
            .any(|o| matches!(o, LanguageOutcome::Recognized { .. }))
    }

    /// The error of the last language in order, used when every language failed.
    pub fn last_error(&self) -> Option<PageError> {
        self.languages.iter().rev().find_map(|lang| match self.outcomes.get(lang) {
            Some(LanguageOutcome::Failed { error, .. }) => Some(error.clone()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use pagewerk_core::PageErrorKind;
    use std::sync::Mutex;

    /// Fails the first `failures` calls per language, then succeeds.
    struct Flaky {
        failures: u32,
        calls: Mutex<BTreeMap<LanguageCode, u32>>,
    }

    impl OcrService for Flaky {
        fn recognize(&self, _: &GrayImage, language: &LanguageCode) -> Result<String, OcrError> {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(language.clone()).or_default();
            *n += 1;
            if language.as_str() == "zzz" {
                return Err(OcrError::UnsupportedLanguage(language.clone()));
            }
            if *n <= self.failures {
                Err(OcrError::Engine("model hiccup".into()))
            } else {
                Ok(format!("text in {language}"))
            }
        }
    }

    fn page() -> GrayImage {
        GrayImage::from_pixel(4, 4, Luma([255]))
    }

    fn langs(codes: &[&str]) -> Vec<LanguageCode> {
        codes.iter().map(|c| LanguageCode::new(*c)).collect()
    }

    #[test]
    fn single_failure_is_retried_once() {
        let service = Flaky { failures: 1, calls: Mutex::default() };
        let mut job = OcrJob::new(PageId(0), &langs(&["eng"]));
        job.run(&service, &page(), &RetryPolicy::default());
        assert_eq!(job.attempts(&LanguageCode::new("eng")), 2);
        assert!(job.any_succeeded());
    }

    #[test]
    fn persistent_failure_gives_up_after_two_attempts() {
        let service = Flaky { failures: 5, calls: Mutex::default() };
        let mut job = OcrJob::new(PageId(3), &langs(&["eng", "deu"]));
        job.run(&service, &page(), &RetryPolicy::default());
        assert!(!job.any_succeeded());
        for lang in langs(&["eng", "deu"]) {
            assert_eq!(job.outcomes[&lang].attempts(), 2);
        }
        let err = job.last_error().unwrap();
        assert_eq!(err.kind, PageErrorKind::OcrFailure);
        assert!(err.message.contains("deu"));
    }

    #[test]
    fn unsupported_language_is_not_retried_and_others_continue() {
        let service = Flaky { failures: 0, calls: Mutex::default() };
        let mut job = OcrJob::new(PageId(0), &langs(&["zzz", "eng"]));
        job.run(&service, &page(), &RetryPolicy::default());
        assert_eq!(job.attempts(&LanguageCode::new("zzz")), 1);
        assert_eq!(job.attempts(&LanguageCode::new("fra")), 0);
        assert_eq!(
            job.outcomes[&LanguageCode::new("eng")].text(),
            Some("text in eng")
        );
        assert!(job.any_succeeded());
    }
}
