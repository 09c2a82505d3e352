// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-preprocess — Everything that happens to a page image before OCR.
//
// Provides page decoding with a resolution cap, quality diagnostics, the six
// ordered preprocessing stages (shadow removal, background normalisation,
// noise reduction, CLAHE, unsharp mask, adaptive threshold), and the profile
// resolver that decides which stages run with which parameters.

pub mod analyze;
pub mod image;
pub mod profile;
pub mod stages;

pub use analyze::ImageDiagnostics;
pub use crate::image::loader::{MAX_LONG_SIDE, decode_bytes, load_page};
pub use profile::builtin::built_in;
pub use profile::resolver::{ProfileResolver, ResolveMode, select_automatic};
pub use stages::{apply, run_stages, run_stages_cancellable};
