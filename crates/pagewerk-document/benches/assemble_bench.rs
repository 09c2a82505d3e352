// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for assembling and rendering a mid-sized document.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pagewerk_core::{
    LanguageCode, LanguageOutcome, Page, PageId, PageMetadata, PageSource, PageStatus,
    TypographySettings,
};
use pagewerk_document::{assemble, render_text};

/// 200 pages of 40 lines with a paragraph gap every fifth line.
fn pages() -> Vec<Page> {
    (0..200)
        .map(|i| {
            let text: String = (0..40)
                .map(|l| {
                    if l % 5 == 4 {
                        "\n\n".to_string()
                    } else {
                        format!("Line {l} of page {i} with some recognised words\n")
                    }
                })
                .collect();
            let mut page = Page::new(PageId(i), PageSource::from(Vec::new()), PageMetadata::default());
            page.status = PageStatus::Done;
            page.recognized.insert(
                LanguageCode::new("eng"),
                LanguageOutcome::Recognized { text, attempts: 1 },
            );
            page
        })
        .collect()
}

fn bench_assemble(c: &mut Criterion) {
    let pages = pages();
    let typography = TypographySettings::default();

    c.bench_function("assemble (200 pages)", |b| {
        b.iter(|| black_box(assemble(black_box(&pages), &typography)));
    });

    if let Ok(model) = assemble(&pages, &typography) {
        c.bench_function("render_text (200 pages)", |b| {
            b.iter(|| black_box(render_text(black_box(&model))));
        });
    }
}

criterion_group!(benches, bench_assemble);
criterion_main!(benches);
