//! Character-level text comparison.

use super::{Artifact, Comparator, ComparatorKind, Comparison, ScoreDetails};
use crate::core::extract::ExtractedDocument;
use crate::core::report::html::render_side_by_side;
use crate::error::CompareError;
use similar::{Algorithm, ChangeTag, TextDiff};

/// Lines of context around each hunk of the patch
pub const PATCH_CONTEXT: usize = 3;

/// Edit counts of a character diff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharDiff {
    pub from_len: usize,
    pub to_len: usize,
    pub inserted: usize,
    pub deleted: usize,
}

impl CharDiff {
    /// `100 * (inserted + deleted) / max(len)`, 0 when both texts are empty
    pub fn score(&self) -> f64 {
        let longest = self.from_len.max(self.to_len);
        if longest == 0 {
            return 0.0;
        }
        100.0 * (self.inserted + self.deleted) as f64 / longest as f64
    }
}

/// Count the characters a minimal edit script inserts and deletes.
///
/// Myers' algorithm yields a shortest edit script, so the counts are the
/// same whichever text comes first (with inserted and deleted swapped).
pub fn char_diff(from: &str, to: &str) -> CharDiff {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(from, to);

    let mut inserted = 0;
    let mut deleted = 0;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => inserted += change.value().chars().count(),
            ChangeTag::Delete => deleted += change.value().chars().count(),
            ChangeTag::Equal => {}
        }
    }

    CharDiff {
        from_len: from.chars().count(),
        to_len: to.chars().count(),
        inserted,
        deleted,
    }
}

/// Line-based unified diff of two texts with the given file labels
pub fn unified_patch(from: &str, to: &str, from_label: &str, to_label: &str) -> String {
    TextDiff::from_lines(from, to)
        .unified_diff()
        .context_radius(PATCH_CONTEXT)
        .header(from_label, to_label)
        .to_string()
}

/// Character diff over OCR or embedded text
#[derive(Debug, Clone, Default)]
pub struct CharDiffComparator {
    html: bool,
}

impl CharDiffComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also render a side-by-side HTML view
    pub fn with_html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    fn text_of(&self, document: &ExtractedDocument) -> Result<String, CompareError> {
        document
            .text()
            .ok_or_else(|| CompareError::IncompatibleContent {
                comparator: self.kind().to_string(),
                content: document.content_name().to_string(),
            })
    }
}

impl Comparator for CharDiffComparator {
    fn compare(
        &self,
        from: &ExtractedDocument,
        to: &ExtractedDocument,
    ) -> Result<Comparison, CompareError> {
        let from_text = self.text_of(from)?;
        let to_text = self.text_of(to)?;

        let diff = char_diff(&from_text, &to_text);

        let mut artifacts = vec![Artifact::Patch(unified_patch(
            &from_text,
            &to_text,
            &from.source.display().to_string(),
            &to.source.display().to_string(),
        ))];
        if self.html {
            artifacts.push(Artifact::Html(render_side_by_side(
                &from_text,
                &to_text,
                PATCH_CONTEXT,
            )));
        }

        Ok(Comparison {
            score: diff.score(),
            details: ScoreDetails::Text {
                from_len: diff.from_len,
                to_len: diff.to_len,
                inserted: diff.inserted,
                deleted: diff.deleted,
            },
            pages: from.page_count().max(to.page_count()),
            artifacts,
        })
    }

    fn kind(&self) -> ComparatorKind {
        ComparatorKind::CharDiff
    }
}
