// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-pipeline — Turns a document of page images into recognised text.
//
// Plans each batch against the machine's cores and memory, runs pages through
// preprocessing and per-language OCR on a worker pool, spills intermediate
// images to disk when memory is tight, and reports per-page progress.

pub mod context;
pub mod ocr;
pub mod planner;
pub mod retry;
pub mod scheduler;
pub mod spill;

pub use context::ExecutionContext;
pub use ocr::{OcrError, OcrJob, OcrService};
pub use planner::{ExecutionPlan, ResourceSnapshot, plan};
pub use retry::{RetryDecision, RetryPolicy};
pub use scheduler::{BatchOutcome, BatchReport, BatchRun, PageResult, PipelineScheduler};
pub use spill::{SpillArea, SpilledPage};

#[cfg(feature = "ocr")]
pub use ocr::engine::{OcrsConfig, OcrsService};
