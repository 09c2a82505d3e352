// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Exporters for the assembled document.
//
// Plain text: every paragraph is followed by a blank line, kept empty lines
// add one more newline each, and page breaks are a form feed on a line of
// their own. Output is UTF-8.

use std::path::Path;

use pagewerk_core::{PipelineError, Result};
use tracing::{info, instrument};

use crate::model::{Block, DocumentModel};

const FORM_FEED: char = '\u{000C}';

/// Render the model as plain text.
pub fn render_text(model: &DocumentModel) -> String {
    let mut out = String::new();
    for block in &model.blocks {
        match block {
            Block::Paragraph { text, .. } => {
                out.push_str(text);
                out.push_str("\n\n");
            }
            Block::EmptyLine { .. } => out.push('\n'),
            Block::PageBreak => {
                out.push(FORM_FEED);
                out.push('\n');
            }
            Block::FailedPlaceholder { marker, .. } => {
                out.push_str(marker);
                out.push_str("\n\n");
            }
        }
    }
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Write the plain-text rendering to `path`.
#[instrument(skip(model), fields(path = %path.display()))]
pub fn write_text(model: &DocumentModel, path: &Path) -> Result<()> {
    let text = render_text(model);
    std::fs::write(path, text.as_bytes()).map_err(|err| {
        PipelineError::Storage(format!("cannot write {}: {}", path.display(), err))
    })?;
    info!(bytes = text.len(), "Text export written");
    Ok(())
}

/// Dump the full model, blocks and styling included, as pretty JSON.
#[instrument(skip(model), fields(path = %path.display()))]
pub fn write_json(model: &DocumentModel, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(model)?;
    std::fs::write(path, json).map_err(|err| {
        PipelineError::Storage(format!("cannot write {}: {}", path.display(), err))
    })?;
    info!("Document model written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PageSetup, ParagraphStyle};
    use pagewerk_core::{PageId, TypographySettings};

    fn model(blocks: Vec<Block>) -> DocumentModel {
        let typography = TypographySettings::default();
        DocumentModel {
            page_setup: PageSetup::from_typography(&typography),
            style: ParagraphStyle::from_typography(&typography),
            blocks,
        }
    }

    #[test]
    fn paragraphs_are_separated_by_a_blank_line() {
        let m = model(vec![
            Block::Paragraph { page: PageId(0), text: "one".into() },
            Block::Paragraph { page: PageId(0), text: "two".into() },
        ]);
        assert_eq!(render_text(&m), "one\n\ntwo\n");
    }

    #[test]
    fn empty_lines_and_page_breaks() {
        let m = model(vec![
            Block::Paragraph { page: PageId(0), text: "one".into() },
            Block::EmptyLine { page: PageId(0) },
            Block::Paragraph { page: PageId(0), text: "two".into() },
            Block::PageBreak,
            Block::FailedPlaceholder { page: PageId(1), marker: "[page 2 could not be recognised]".into() },
        ]);
        assert_eq!(
            render_text(&m),
            "one\n\n\ntwo\n\n\u{c}\n[page 2 could not be recognised]\n"
        );
    }

    #[test]
    fn empty_model_renders_nothing() {
        assert_eq!(render_text(&model(Vec::new())), "");
    }

    #[test]
    fn writes_utf8_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let m = model(vec![Block::Paragraph { page: PageId(0), text: "Größe – naïve".into() }]);
        write_text(&m, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Größe – naïve\n");
    }

    #[test]
    fn json_dump_tags_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        write_json(&model(vec![Block::PageBreak]), &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["blocks"][0]["kind"], "page_break");
        assert_eq!(value["style"]["font_family"], "Times New Roman");
    }

    #[test]
    fn unwritable_path_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        assert!(matches!(
            write_text(&model(Vec::new()), &path),
            Err(PipelineError::Storage(_))
        ));
    }
}
