//! CSV layouts of `results.csv` and `errors.csv`.

use super::ComparisonResult;
use crate::core::comparator::{ComparatorKind, ScoreDetails};

/// Header of `errors.csv`
pub const ERRORS_HEADER: [&str; 4] = ["File", "Metric", "Error kind", "Message"];

/// Header of `results.csv` for a comparator
pub fn results_header(metric: ComparatorKind) -> &'static [&'static str] {
    match metric {
        ComparatorKind::CharDiff => &["File", "From length", "To length", "Char diff(%)"],
        ComparatorKind::PixelDiff => &[
            "File",
            "Pages",
            "Mismatched pixels",
            "Total pixels",
            "Pixel diff(%)",
        ],
        ComparatorKind::EmbeddingSimilarity => {
            &["File", "Pages", "Cosine similarity", "Embedding diff(%)"]
        }
        ComparatorKind::StructuralSimilarity => {
            &["File", "Pages", "Correlation", "Structural diff(%)"]
        }
    }
}

/// Scores always carry two decimals
pub fn format_score(score: f64) -> String {
    format!("{:.2}", score)
}

/// One `results.csv` row for a successful result
pub fn result_record(result: &ComparisonResult) -> Vec<String> {
    let score = format_score(result.score);
    let mut record = vec![result.pair_id.clone()];

    match &result.details {
        ScoreDetails::Text {
            from_len, to_len, ..
        } => {
            record.push(from_len.to_string());
            record.push(to_len.to_string());
        }
        ScoreDetails::Pixel { mismatched, total } => {
            record.push(result.pages.to_string());
            record.push(mismatched.to_string());
            record.push(total.to_string());
        }
        ScoreDetails::Embedding { cosine } => {
            record.push(result.pages.to_string());
            record.push(format!("{:.4}", cosine));
        }
        ScoreDetails::Structural { correlation } => {
            record.push(result.pages.to_string());
            record.push(format!("{:.4}", correlation));
        }
        ScoreDetails::None => {}
    }

    record.push(score);
    record
}

/// One `errors.csv` row for a failed result
pub fn error_record(result: &ComparisonResult) -> Vec<String> {
    let (kind, message) = match &result.error {
        Some(failure) => (failure.kind.to_string(), failure.message.clone()),
        None => (String::new(), String::new()),
    };

    vec![result.pair_id.clone(), result.metric.to_string(), kind, message]
}
