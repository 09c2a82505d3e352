// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document model — the in-memory result of assembly, consumed by exporters.

use pagewerk_core::{Alignment, Margins, PageId, PaperSize, TypographySettings};
use serde::Serialize;

/// Physical page geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSetup {
    pub paper: PaperSize,
    pub width_mm: u32,
    pub height_mm: u32,
    pub margins: Margins,
}

/// Styling applied uniformly to every paragraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphStyle {
    pub font_family: String,
    pub font_size_pt: f32,
    pub alignment: Alignment,
    pub line_height_percent: u32,
    pub first_line_indent_mm: f32,
    pub spacing_after_pt: f32,
}

impl PageSetup {
    pub fn from_typography(typography: &TypographySettings) -> Self {
        let (width_mm, height_mm) = typography.paper_size.dimensions_mm();
        Self {
            paper: typography.paper_size,
            width_mm,
            height_mm,
            margins: typography.margins,
        }
    }
}

impl ParagraphStyle {
    pub fn from_typography(typography: &TypographySettings) -> Self {
        Self {
            font_family: typography.font_family.clone(),
            font_size_pt: typography.font_size_pt,
            alignment: typography.alignment,
            line_height_percent: typography.line_height_percent,
            first_line_indent_mm: typography.first_line_indent_mm,
            spacing_after_pt: typography.spacing_after_pt,
        }
    }
}

/// One block of the document flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Text may contain `\n` when line breaks are preserved.
    Paragraph { page: PageId, text: String },
    EmptyLine { page: PageId },
    PageBreak,
    /// Stands in for a page that could not be recognised.
    FailedPlaceholder { page: PageId, marker: String },
}

impl Block {
    /// Source page, if the block came from one.
    pub fn page(&self) -> Option<PageId> {
        match self {
            Self::Paragraph { page, .. }
            | Self::EmptyLine { page }
            | Self::FailedPlaceholder { page, .. } => Some(*page),
            Self::PageBreak => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentModel {
    pub page_setup: PageSetup,
    pub style: ParagraphStyle,
    pub blocks: Vec<Block>,
}

impl DocumentModel {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn page_breaks(&self) -> usize {
        self.blocks.iter().filter(|b| matches!(b, Block::PageBreak)).count()
    }
}
