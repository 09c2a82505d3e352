// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-document — Turns per-page OCR text into one styled document.
//
// Assembly is a pure function of the ordered pages and the typography
// settings. Exporters render the resulting model to plain text or dump it as
// JSON for inspection.

pub mod assemble;
pub mod export;
pub mod model;

pub use assemble::{assemble, assemble_document, assemble_preferring};
pub use export::{render_text, write_json, write_text};
pub use model::{Block, DocumentModel, PageSetup, ParagraphStyle};
