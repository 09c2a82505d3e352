// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy for OCR calls.
//
// Engine errors are treated as transient and retried immediately up to the
// attempt limit. A missing language model is permanent.

use tracing::debug;

use crate::ocr::OcrError;

/// How often one language may be attempted on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    /// One try plus one retry.
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryNow,
    /// The error cannot be fixed by trying again.
    GiveUp,
    /// Attempt limit reached.
    Exhausted,
}

pub fn is_transient(err: &OcrError) -> bool {
    match err {
        OcrError::UnsupportedLanguage(_) => false,
        OcrError::Engine(_) => true,
    }
}

/// Decide what to do after attempt number `attempt` (1-based) failed.
pub fn should_retry(err: &OcrError, attempt: u32, policy: &RetryPolicy) -> RetryDecision {
    if !is_transient(err) {
        debug!("permanent OCR error, not retrying");
        return RetryDecision::GiveUp;
    }
    if attempt >= policy.max_attempts {
        debug!(attempt, max = policy.max_attempts, "OCR retry limit reached");
        return RetryDecision::Exhausted;
    }
    RetryDecision::RetryNow
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewerk_core::LanguageCode;

    #[test]
    fn engine_error_retries_once() {
        let policy = RetryPolicy::default();
        let err = OcrError::Engine("timeout".into());
        assert_eq!(should_retry(&err, 1, &policy), RetryDecision::RetryNow);
        assert_eq!(should_retry(&err, 2, &policy), RetryDecision::Exhausted);
    }

    #[test]
    fn missing_language_never_retries() {
        let err = OcrError::UnsupportedLanguage(LanguageCode::new("tlh"));
        assert_eq!(
            should_retry(&err, 1, &RetryPolicy::default()),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn single_attempt_policy() {
        let policy = RetryPolicy { max_attempts: 1 };
        let err = OcrError::Engine("boom".into());
        assert_eq!(should_retry(&err, 1, &policy), RetryDecision::Exhausted);
    }
}
