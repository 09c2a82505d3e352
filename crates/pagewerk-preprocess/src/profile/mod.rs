// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Profile module — built-in preprocessing profiles and the resolver that
// chooses, stores and edits them.

pub mod builtin;
pub mod resolver;

pub use builtin::built_in;
pub use resolver::{ProfileResolver, ResolveMode, select_automatic};
