// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — page decoding and the resolution safety cap.

pub mod loader;

pub use loader::{MAX_LONG_SIDE, decode_bytes, load_page};
