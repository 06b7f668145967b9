//! # Core Module
//!
//! The UI-agnostic comparison engine.
//!
//! ## Modules
//! - `pairing` - Matches documents by file name across two directories
//! - `extract` - Turns a PDF into page images or text
//! - `comparator` - Scores the difference between two extracted documents
//! - `report` - Writes CSV rows, artifacts and the run manifest
//! - `pipeline` - Orchestrates the full workflow

pub mod comparator;
pub mod extract;
pub mod pairing;
pub mod pipeline;
pub mod report;

// Re-export commonly used types
pub use comparator::{Comparator, ComparatorKind, Comparison, ScoreDetails};
pub use extract::{
    ContentExtractor, ExtractedContent, ExtractedDocument, ExtractorKind, PageSelection,
};
pub use pairing::{DocumentPair, PairFinder, PairingResult};
pub use report::{ComparisonResult, ReportWriter};
