// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagewerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{PageId, PageStatus};

/// Top-level error type for all Pagewerk operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    // -- Preprocessing errors --
    #[error("invalid parameter {stage}.{field}: {reason}")]
    InvalidParameter {
        stage: String,
        field: String,
        reason: String,
    },

    #[error("stage order violation: {0}")]
    StageOrder(String),

    #[error("unknown preprocessing profile: {0}")]
    UnknownProfile(String),

    #[error("editing profile {profile:?} requires the professional control level")]
    ControlLevelViolation { profile: String },

    #[error("failed to decode page image: {0}")]
    DecodeFailure(String),

    // -- Recognition errors --
    #[error("OCR failed for language {language}: {detail}")]
    OcrFailure { language: String, detail: String },

    // -- Execution errors --
    #[error("resource budget exhausted: {0}")]
    ResourceExhausted(String),

    #[error("batch cancelled")]
    Cancelled,

    #[error("execution plan is stale: planned for {planned} pages, document has {actual}")]
    StalePlan { planned: usize, actual: usize },

    #[error("temporary storage error: {0}")]
    Storage(String),

    // -- Assembly errors --
    #[error("cannot assemble document: {page} is still {status:?}")]
    AssemblyIncomplete { page: PageId, status: PageStatus },

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Shorthand for building an [`PipelineError::InvalidParameter`].
    pub fn invalid_parameter(
        stage: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            stage: stage.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Classification of a page-local failure, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageErrorKind {
    InvalidParameter,
    DecodeFailure,
    OcrFailure,
    Storage,
    /// A worker died or an invariant broke while the page was in flight.
    Internal,
}

/// A page-scoped error. Unlike [`PipelineError`] this is cheap to clone and
/// serialisable, so it can travel inside progress updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    pub kind: PageErrorKind,
    pub message: String,
}

impl PageError {
    pub fn new(kind: PageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl From<&PipelineError> for PageError {
    fn from(err: &PipelineError) -> Self {
        let kind = match err {
            PipelineError::InvalidParameter { .. } | PipelineError::StageOrder(_) => {
                PageErrorKind::InvalidParameter
            }
            PipelineError::DecodeFailure(_) => PageErrorKind::DecodeFailure,
            PipelineError::OcrFailure { .. } => PageErrorKind::OcrFailure,
            PipelineError::Storage(_) | PipelineError::Io(_) => PageErrorKind::Storage,
            _ => PageErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_names_stage_and_field() {
        let err = PipelineError::invalid_parameter("clahe", "clip_limit", "must be in 1..=10");
        assert_eq!(
            err.to_string(),
            "invalid parameter clahe.clip_limit: must be in 1..=10"
        );
    }

    #[test]
    fn page_error_classifies_decode_failure() {
        let err = PipelineError::DecodeFailure("truncated PNG".into());
        let page_err = PageError::from(&err);
        assert_eq!(page_err.kind, PageErrorKind::DecodeFailure);
        assert!(page_err.message.contains("truncated PNG"));
    }

    #[test]
    fn page_error_classifies_io_as_storage() {
        let err = PipelineError::Io(std::io::Error::other("disk full"));
        assert_eq!(PageError::from(&err).kind, PageErrorKind::Storage);
    }
}
