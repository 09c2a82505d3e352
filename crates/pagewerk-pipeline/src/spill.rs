// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Disk spill for disk-assisted runs.
//
// Preprocessed pages are written as lossless PNG into a per-run directory and
// read back just before OCR. Files are removed when their handle drops and the
// directory when the area drops, so nothing outlives the run.

use std::path::Path;

use image::{GrayImage, ImageFormat};
use pagewerk_core::{PageId, PipelineError, Result};
use tempfile::{NamedTempFile, TempDir};
use tracing::debug;
use uuid::Uuid;

/// Per-run spill directory.
#[derive(Debug)]
pub struct SpillArea {
    dir: TempDir,
}

impl SpillArea {
    pub fn create(root: &Path, run_id: Uuid) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("pagewerk-{run_id}-"))
            .tempdir_in(root)
            .map_err(|err| {
                PipelineError::Storage(format!(
                    "cannot create spill area under {}: {}",
                    root.display(),
                    err
                ))
            })?;
        debug!(path = %dir.path().display(), "Spill area created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `image` to a fresh file in the area.
    pub fn store(&self, page: PageId, image: &GrayImage) -> Result<SpilledPage> {
        let file = tempfile::Builder::new()
            .prefix(&format!("page-{:05}-", page.0))
            .suffix(".png")
            .tempfile_in(self.dir.path())
            .map_err(|err| PipelineError::Storage(format!("cannot create spill file for {page}: {err}")))?;
        image
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|err| PipelineError::Storage(format!("cannot spill {page}: {err}")))?;
        debug!(%page, path = %file.path().display(), "Page spilled");
        Ok(SpilledPage { page, file })
    }
}

/// A page image parked on disk.
#[derive(Debug)]
pub struct SpilledPage {
    page: PageId,
    file: NamedTempFile,
}

impl SpilledPage {
    pub fn page(&self) -> PageId {
        self.page
    }

    /// Read the image back. The file is deleted when `self` drops.
    pub fn load(&self) -> Result<GrayImage> {
        let decoded = image::open(self.file.path()).map_err(|err| {
            PipelineError::Storage(format!("cannot read spilled {}: {}", self.page, err))
        })?;
        Ok(decoded.to_luma8())
    }
}
