// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembler — ordered per-page OCR text in, document model out.
//
// Pure and deterministic: the same pages and settings always give the same
// model. Pages are taken in id order whatever order they arrive in.

use pagewerk_core::{
    Document, LanguageCode, Page, PageId, PageStatus, ParagraphPolicy, PipelineError, Result,
    TypographySettings,
};
use tracing::{debug, info, instrument};

use crate::model::{Block, DocumentModel, PageSetup, ParagraphStyle};

/// Assemble using whichever language succeeded first on each page.
pub fn assemble(pages: &[Page], typography: &TypographySettings) -> Result<DocumentModel> {
    assemble_preferring(pages, &[], typography)
}

/// Assemble a finished document, preferring text in `languages` order.
pub fn assemble_document(document: &Document, languages: &[LanguageCode]) -> Result<DocumentModel> {
    assemble_preferring(&document.pages, languages, &document.typography)
}

/// Assemble, taking each page's text in the first of `languages` that
/// succeeded on it.
///
/// Fails with `AssemblyIncomplete` while any page is still in flight.
/// Cancelled pages are left out; failed pages become a placeholder.
#[instrument(skip_all, fields(pages = pages.len(), languages = languages.len()))]
pub fn assemble_preferring(
    pages: &[Page],
    languages: &[LanguageCode],
    typography: &TypographySettings,
) -> Result<DocumentModel> {
    let mut ordered: Vec<&Page> = pages.iter().collect();
    ordered.sort_by_key(|p| p.id);

    if let Some(page) = ordered.iter().find(|p| !p.status.is_terminal()) {
        return Err(PipelineError::AssemblyIncomplete {
            page: page.id,
            status: page.status,
        });
    }

    let mut blocks = Vec::new();
    let mut contributed = 0usize;
    for page in ordered {
        let page_blocks = match page.status {
            PageStatus::Cancelled => {
                debug!(page = %page.id, "Cancelled page left out");
                continue;
            }
            PageStatus::Failed => vec![Block::FailedPlaceholder {
                page: page.id,
                marker: failed_marker(page.id),
            }],
            _ => text_blocks(page.id, page.preferred_text(languages).unwrap_or(""), typography),
        };
        if page_blocks.is_empty() {
            debug!(page = %page.id, "Blank page left out");
            continue;
        }
        if contributed > 0 && typography.insert_page_break_between_pages {
            blocks.push(Block::PageBreak);
        }
        blocks.extend(page_blocks);
        contributed += 1;
    }

    info!(pages = contributed, blocks = blocks.len(), policy = ?typography.paragraph_policy, "Document assembled");
    Ok(DocumentModel {
        page_setup: PageSetup::from_typography(typography),
        style: ParagraphStyle::from_typography(typography),
        blocks,
    })
}

/// Marker text shown in place of an unrecognised page (1-based for readers).
pub fn failed_marker(page: PageId) -> String {
    format!("[page {} could not be recognised]", page.0 + 1)
}

/// Split one page's text into paragraph and empty-line blocks.
fn text_blocks(page: PageId, text: &str, typography: &TypographySettings) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut empty_run = 0usize;

    for &line in &lines[first..=last] {
        if line.is_empty() {
            flush(page, &mut paragraph, typography, &mut blocks);
            empty_run += 1;
            if empty_run <= typography.max_empty_lines {
                blocks.push(Block::EmptyLine { page });
            }
            continue;
        }
        empty_run = 0;
        match typography.paragraph_policy {
            ParagraphPolicy::LinePerParagraph => blocks.push(Block::Paragraph {
                page,
                text: line.trim_start().to_string(),
            }),
            ParagraphPolicy::BlankLineSeparated => paragraph.push(line),
        }
    }
    flush(page, &mut paragraph, typography, &mut blocks);
    blocks
}

fn flush(page: PageId, lines: &mut Vec<&str>, typography: &TypographySettings, out: &mut Vec<Block>) {
    if lines.is_empty() {
        return;
    }
    let text = if typography.preserve_line_breaks {
        lines.join("\n")
    } else {
        lines.iter().map(|l| l.trim()).collect::<Vec<_>>().join(" ")
    };
    out.push(Block::Paragraph { page, text });
    lines.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewerk_core::{LanguageOutcome, PageErrorKind, PageError, PageMetadata, PageSource};

    fn page(id: usize, status: PageStatus, text: &str) -> Page {
        let mut page = Page::new(PageId(id), PageSource::from(Vec::new()), PageMetadata::default());
        page.status = status;
        if status == PageStatus::Done {
            page.recognized.insert(
                LanguageCode::new("eng"),
                LanguageOutcome::Recognized { text: text.to_string(), attempts: 1 },
            );
        }
        if status == PageStatus::Failed {
            page.error = Some(PageError::new(PageErrorKind::OcrFailure, "boom"));
        }
        page
    }

    fn no_breaks() -> TypographySettings {
        TypographySettings {
            insert_page_break_between_pages: false,
            ..Default::default()
        }
    }

    #[test]
    fn pages_are_ordered_by_id() {
        let pages = vec![
            page(2, PageStatus::Done, "third"),
            page(0, PageStatus::Done, "first"),
            page(1, PageStatus::Done, "second"),
        ];
        let model = assemble(&pages, &no_breaks()).unwrap();
        assert_eq!(model.paragraphs().collect::<Vec<_>>(), ["first", "second", "third"]);
    }

    #[test]
    fn in_flight_page_blocks_assembly() {
        let pages = vec![page(0, PageStatus::Done, "a"), page(1, PageStatus::Recognizing, "")];
        assert!(matches!(
            assemble(&pages, &no_breaks()),
            Err(PipelineError::AssemblyIncomplete { page: PageId(1), status: PageStatus::Recognizing })
        ));
    }

    #[test]
    fn page_breaks_go_between_contributing_pages() {
        let pages = vec![
            page(0, PageStatus::Done, "a"),
            page(1, PageStatus::Cancelled, ""),
            page(2, PageStatus::Failed, ""),
            page(3, PageStatus::Done, "d"),
        ];
        let model = assemble(&pages, &TypographySettings::default()).unwrap();
        assert_eq!(
            model.blocks,
            vec![
                Block::Paragraph { page: PageId(0), text: "a".into() },
                Block::PageBreak,
                Block::FailedPlaceholder { page: PageId(2), marker: failed_marker(PageId(2)) },
                Block::PageBreak,
                Block::Paragraph { page: PageId(3), text: "d".into() },
            ]
        );
    }

    #[test]
    fn blank_page_adds_no_extra_break() {
        let pages = vec![
            page(0, PageStatus::Done, "a"),
            page(1, PageStatus::Done, "  \n\n"),
            page(2, PageStatus::Done, "c"),
        ];
        let model = assemble(&pages, &TypographySettings::default()).unwrap();
        assert_eq!(model.page_breaks(), 1);
        assert_eq!(model.paragraphs().collect::<Vec<_>>(), ["a", "c"]);
    }

    #[test]
    fn blank_runs_collapse_to_the_limit() {
        let typography = TypographySettings {
            max_empty_lines: 2,
            ..no_breaks()
        };
        let pages = vec![page(0, PageStatus::Done, "\n\nalpha\n\n\n\n\nbeta\n\n\n")];
        let model = assemble(&pages, &typography).unwrap();
        let empties = model.blocks.iter().filter(|b| matches!(b, Block::EmptyLine { .. })).count();
        assert_eq!(empties, 2);
        assert!(matches!(model.blocks.first(), Some(Block::Paragraph { .. })));
        assert!(matches!(model.blocks.last(), Some(Block::Paragraph { .. })));
    }

    #[test]
    fn zero_empty_lines_still_separates_paragraphs() {
        let typography = TypographySettings {
            max_empty_lines: 0,
            ..no_breaks()
        };
        let pages = vec![page(0, PageStatus::Done, "one\ntwo\n\nthree")];
        let model = assemble(&pages, &typography).unwrap();
        assert_eq!(model.paragraphs().collect::<Vec<_>>(), ["one two", "three"]);
        assert_eq!(model.blocks.len(), 2);
    }

    #[test]
    fn line_per_paragraph_policy() {
        let typography = TypographySettings {
            paragraph_policy: ParagraphPolicy::LinePerParagraph,
            ..no_breaks()
        };
        let pages = vec![page(0, PageStatus::Done, "one\ntwo\n\nthree")];
        let model = assemble(&pages, &typography).unwrap();
        assert_eq!(model.paragraphs().collect::<Vec<_>>(), ["one", "two", "three"]);
    }

    #[test]
    fn preserved_line_breaks_stay_inside_paragraph() {
        let typography = TypographySettings {
            preserve_line_breaks: true,
            ..no_breaks()
        };
        let pages = vec![page(0, PageStatus::Done, "one\ntwo")];
        let model = assemble(&pages, &typography).unwrap();
        assert_eq!(model.paragraphs().collect::<Vec<_>>(), ["one\ntwo"]);
    }

    #[test]
    fn preferred_language_is_used() {
        let mut p = page(0, PageStatus::Done, "english");
        p.recognized.insert(
            LanguageCode::new("deu"),
            LanguageOutcome::Recognized { text: "deutsch".into(), attempts: 1 },
        );
        let model =
            assemble_preferring(&[p], &[LanguageCode::new("deu")], &no_breaks()).unwrap();
        assert_eq!(model.paragraphs().collect::<Vec<_>>(), ["deutsch"]);
    }

    #[test]
    fn assembly_is_deterministic() {
        let pages = vec![
            page(1, PageStatus::Done, "b\n\n\nc"),
            page(0, PageStatus::Failed, ""),
        ];
        let typography = TypographySettings::default();
        assert_eq!(
            assemble(&pages, &typography).unwrap(),
            assemble(&pages, &typography).unwrap()
        );
    }

    #[test]
    fn style_comes_from_typography() {
        let typography = TypographySettings {
            font_family: "Liberation Serif".into(),
            font_size_pt: 11.0,
            ..Default::default()
        };
        let model = assemble(&[], &typography).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.style.font_family, "Liberation Serif");
        assert_eq!(model.page_setup.width_mm, 210);
    }
}
