//! Integration tests for the pipeline module.
//!
//! These tests run whole comparisons end to end:
//! - Text layer pairs scored with the character diff
//! - Directories holding a different number of documents
//! - Image strategies on top of an injected rasterizer
//! - Broken pairs recorded without stopping the run

mod common;

use common::{csv_lines, write_swatch, write_text_pdf, SwatchRasterizer};
use pdf_pair_compare::core::comparator::{ComparatorKind, ScoreDetails};
use pdf_pair_compare::core::extract::{ExtractorKind, PageSelection};
use pdf_pair_compare::core::pipeline::{Pipeline, PipelineConfig};
use pdf_pair_compare::core::report::ReportManifest;
use pdf_pair_compare::error::ErrorKind;
use pdf_pair_compare::events::{event_channel, Event, PairingEvent, RunState};
use std::sync::Arc;
use tempfile::TempDir;

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];

struct Dirs {
    _root: TempDir,
    from: std::path::PathBuf,
    to: std::path::PathBuf,
    out: std::path::PathBuf,
}

fn dirs() -> Dirs {
    let root = TempDir::new().unwrap();
    let from = root.path().join("from");
    let to = root.path().join("to");
    let out = root.path().join("out");
    std::fs::create_dir_all(&from).unwrap();
    std::fs::create_dir_all(&to).unwrap();
    Dirs {
        _root: root,
        from,
        to,
        out,
    }
}

fn text_config(dirs: &Dirs) -> PipelineConfig {
    PipelineConfig {
        from: dirs.from.clone(),
        to: dirs.to.clone(),
        result: dirs.out.clone(),
        only_diff_text: true,
        sort: true,
        workers: 2,
        ..PipelineConfig::default()
    }
}

#[test]
fn text_layers_are_compared_and_reported() {
    let dirs = dirs();
    write_text_pdf(&dirs.from, "same.pdf", &[&["Quarterly report"]]);
    write_text_pdf(&dirs.to, "same.pdf", &[&["Quarterly report"]]);
    write_text_pdf(&dirs.from, "changed.pdf", &[&["hello world"]]);
    write_text_pdf(&dirs.to, "changed.pdf", &[&["hello World"]]);

    let config = PipelineConfig {
        html: true,
        ..text_config(&dirs)
    };
    let result = Pipeline::builder().config(config).build().run().unwrap();

    assert_eq!(result.state, RunState::Completed);
    assert_eq!(result.total_pairs, 2);
    assert!(result.failures.is_empty());

    let same = result.results.iter().find(|r| r.pair_id == "same.pdf").unwrap();
    assert_eq!(same.score, 0.0);

    let changed = result.results.iter().find(|r| r.pair_id == "changed.pdf").unwrap();
    assert!(changed.score > 0.0);
    assert_eq!(
        changed.details,
        ScoreDetails::Text {
            from_len: 11,
            to_len: 11,
            inserted: 1,
            deleted: 1,
        }
    );

    // Sorted rows, header first
    let lines = csv_lines(&dirs.out.join("results.csv"));
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("File,"));
    assert!(lines[1].starts_with("changed.pdf,"));
    assert!(lines[2].starts_with("same.pdf,"));

    let patch = std::fs::read_to_string(dirs.out.join("diff/changed.pdf.patch")).unwrap();
    assert!(patch.contains("-hello world"));
    assert!(patch.contains("+hello World"));
    assert!(dirs.out.join("changed.pdf.html").exists());

    let manifest: ReportManifest =
        serde_json::from_str(&std::fs::read_to_string(dirs.out.join("report.json")).unwrap())
            .unwrap();
    assert_eq!(manifest.rows, 2);
    assert_eq!(manifest.metric, ComparatorKind::CharDiff);
    assert_eq!(manifest.extractor, Some(ExtractorKind::EmbeddedText));
    assert_eq!(manifest.state, RunState::Completed);
}

#[test]
fn count_mismatch_is_a_warning_not_an_error() {
    let dirs = dirs();
    write_text_pdf(&dirs.from, "doc1.pdf", &[&["one"]]);
    write_text_pdf(&dirs.from, "doc2.pdf", &[&["two"]]);
    write_text_pdf(&dirs.to, "doc1.pdf", &[&["one"]]);

    let (sender, receiver) = event_channel();
    let result = Pipeline::builder()
        .config(text_config(&dirs))
        .build()
        .run_with_events(&sender)
        .unwrap();
    drop(sender);

    assert_eq!(result.total_pairs, 1);
    assert_eq!(result.results[0].pair_id, "doc1.pdf");
    let mismatch = result.count_mismatch.unwrap();
    assert_eq!(
        mismatch.to_string(),
        "Number of files differ: from has 2, to has 1"
    );

    let warned = receiver.iter().any(|event| {
        matches!(
            event,
            Event::Pairing(PairingEvent::CountMismatch {
                from_count: 2,
                to_count: 1
            })
        )
    });
    assert!(warned);
}

#[test]
fn only_the_extension_filter_pairs() {
    let dirs = dirs();
    write_text_pdf(&dirs.from, "a.pdf", &[&["a"]]);
    write_text_pdf(&dirs.to, "a.pdf", &[&["a"]]);
    std::fs::write(dirs.from.join("notes.txt"), "ignored").unwrap();
    std::fs::write(dirs.to.join("notes.txt"), "ignored").unwrap();
    write_text_pdf(&dirs.from, "UPPER.PDF", &[&["x"]]);
    write_text_pdf(&dirs.to, "UPPER.PDF", &[&["x"]]);

    let result = Pipeline::builder()
        .config(text_config(&dirs))
        .build()
        .run()
        .unwrap();

    assert_eq!(result.total_pairs, 1);
    assert_eq!(result.results[0].pair_id, "a.pdf");
}

#[test]
fn pixel_diff_scores_and_masks_each_pair() {
    let dirs = dirs();
    write_swatch(&dirs.from, "blank.pdf", &[WHITE]);
    write_swatch(&dirs.to, "blank.pdf", &[WHITE]);
    write_swatch(&dirs.from, "inverted.pdf", &[WHITE]);
    write_swatch(&dirs.to, "inverted.pdf", &[BLACK]);

    let result = Pipeline::builder()
        .dirs(&dirs.from, &dirs.to, &dirs.out)
        .strategy(ExtractorKind::Raster, ComparatorKind::PixelDiff)
        .rasterizer(Arc::new(SwatchRasterizer))
        .workers(2)
        .build()
        .run()
        .unwrap();

    assert_eq!(result.state, RunState::Completed);
    let score = |id: &str| result.results.iter().find(|r| r.pair_id == id).unwrap().score;
    assert_eq!(score("blank.pdf"), 0.0);
    assert_eq!(score("inverted.pdf"), 100.0);

    assert!(dirs.out.join("diff/inverted.pdf.page-1.png").exists());
    let mask = image::open(dirs.out.join("diff/inverted.pdf.page-1.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(mask.get_pixel(0, 0).0, [255, 0, 0, 255]);
}

#[test]
fn all_pages_are_compared_when_selected() {
    let dirs = dirs();
    write_swatch(&dirs.from, "two.pdf", &[WHITE, WHITE]);
    write_swatch(&dirs.to, "two.pdf", &[WHITE, BLACK]);

    let run = |pages: PageSelection| {
        Pipeline::builder()
            .dirs(&dirs.from, &dirs.to, &dirs.out)
            .strategy(ExtractorKind::Raster, ComparatorKind::PixelDiff)
            .pages(pages)
            .rasterizer(Arc::new(SwatchRasterizer))
            .build()
            .run()
            .unwrap()
    };

    let first = run(PageSelection::First);
    assert_eq!(first.results[0].score, 0.0);
    assert_eq!(first.results[0].pages, 1);

    let all = run(PageSelection::All);
    assert_eq!(all.results[0].score, 50.0);
    assert_eq!(all.results[0].pages, 2);
}

#[test]
fn structural_and_embedding_strategies_run_end_to_end() {
    let dirs = dirs();
    write_swatch(&dirs.from, "a.pdf", &[WHITE]);
    write_swatch(&dirs.to, "a.pdf", &[WHITE]);

    for comparator in [
        ComparatorKind::StructuralSimilarity,
        ComparatorKind::EmbeddingSimilarity,
    ] {
        let result = Pipeline::builder()
            .dirs(&dirs.from, &dirs.to, &dirs.out)
            .strategy(ExtractorKind::Raster, comparator)
            .rasterizer(Arc::new(SwatchRasterizer))
            .build()
            .run()
            .unwrap();

        assert_eq!(result.state, RunState::Completed, "{}", comparator);
        assert_eq!(result.results[0].metric, comparator);
        assert!(result.results[0].score.abs() < 1e-9, "{}", comparator);
    }
}

#[test]
fn broken_pairs_are_recorded_and_the_run_continues() {
    let dirs = dirs();
    write_swatch(&dirs.from, "good.pdf", &[WHITE]);
    write_swatch(&dirs.to, "good.pdf", &[BLACK]);
    std::fs::write(dirs.from.join("broken.pdf"), "%PDF-1.4 garbage").unwrap();
    write_swatch(&dirs.to, "broken.pdf", &[WHITE]);
    write_swatch(&dirs.from, "short.pdf", &[WHITE, WHITE]);
    write_swatch(&dirs.to, "short.pdf", &[WHITE]);

    let result = Pipeline::builder()
        .dirs(&dirs.from, &dirs.to, &dirs.out)
        .strategy(ExtractorKind::Raster, ComparatorKind::PixelDiff)
        .pages(PageSelection::All)
        .rasterizer(Arc::new(SwatchRasterizer))
        .build()
        .run()
        .unwrap();

    assert_eq!(result.state, RunState::CompletedWithErrors);
    assert_eq!(result.total_pairs, 3);
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.failures.len(), 2);

    let kind = |id: &str| {
        result
            .failures
            .iter()
            .find(|r| r.pair_id == id)
            .and_then(|r| r.error.as_ref())
            .map(|e| e.kind)
    };
    assert_eq!(kind("broken.pdf"), Some(ErrorKind::ConversionError));
    assert_eq!(kind("short.pdf"), Some(ErrorKind::PageCountMismatch));

    assert_eq!(csv_lines(&dirs.out.join("results.csv")).len(), 2);
    let errors = csv_lines(&dirs.out.join("errors.csv"));
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|line| line.contains("ConversionError")));
}

#[test]
fn keep_intermediate_leaves_text_dumps() {
    let dirs = dirs();
    write_text_pdf(&dirs.from, "a.pdf", &[&["kept text"]]);
    write_text_pdf(&dirs.to, "a.pdf", &[&["kept text"]]);

    let config = PipelineConfig {
        keep_intermediate: true,
        ..text_config(&dirs)
    };
    Pipeline::builder().config(config).build().run().unwrap();

    let dump = std::fs::read_to_string(dirs.out.join("from/a.pdf.txt")).unwrap();
    assert_eq!(dump, "kept text");
    assert!(dirs.out.join("to/a.pdf.txt").exists());
}
