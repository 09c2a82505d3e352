// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk — Core types, configuration, and error definitions shared across
// all crates.

pub mod cancel;
pub mod config;
pub mod error;
pub mod types;

pub use cancel::{CancelToken, PressureSignal};
pub use config::PipelineConfig;
pub use error::{PageError, PageErrorKind, PipelineError, Result};
pub use types::*;
