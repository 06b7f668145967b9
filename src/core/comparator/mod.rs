//! # Comparator Module
//!
//! Scores how different two extracted documents are.
//!
//! ## Strategies
//! | Comparator | Input | Score (0 = identical) |
//! |------------|-------|-----------------------|
//! | Pixel diff | raster | % of mismatched pixels |
//! | Embedding similarity | raster | 100 x (1 - cosine) |
//! | Structural similarity | raster | 100 x (1 - correlation) |
//! | Character diff | OCR / embedded text | % of inserted + deleted chars |
//!
//! Every comparison is pure: no state is kept between pairs. Image
//! comparators work page by page and require equal page counts.

mod embedding;
mod pixel;
mod structural;
mod text;
mod thumbnail;

#[cfg(feature = "clip")]
mod clip;

pub use embedding::{cosine_similarity, EmbeddingComparator, EmbeddingModel};
pub use pixel::{PixelDiffComparator, HIGHLIGHT};
pub use structural::{correlation_coefficient, StructuralComparator};
pub use text::{char_diff, unified_patch, CharDiff, CharDiffComparator};
pub use thumbnail::ThumbnailEmbedder;

#[cfg(feature = "clip")]
pub use clip::ClipEmbedder;

use crate::core::extract::{ExtractedDocument, ExtractorKind};
use crate::error::CompareError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Available comparison strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparatorKind {
    PixelDiff,
    EmbeddingSimilarity,
    StructuralSimilarity,
    CharDiff,
}

impl ComparatorKind {
    /// Whether this comparator can consume what `extractor` produces
    pub fn accepts(&self, extractor: ExtractorKind) -> bool {
        match self {
            ComparatorKind::CharDiff => extractor.produces_text(),
            _ => extractor == ExtractorKind::Raster,
        }
    }
}

impl std::fmt::Display for ComparatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparatorKind::PixelDiff => write!(f, "pixel-diff"),
            ComparatorKind::EmbeddingSimilarity => write!(f, "embedding-similarity"),
            ComparatorKind::StructuralSimilarity => write!(f, "structural-similarity"),
            ComparatorKind::CharDiff => write!(f, "char-diff"),
        }
    }
}

/// Which model backs the embedding comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingModelKind {
    /// Built-in 32x32 grayscale thumbnail
    #[default]
    Thumbnail,
    /// CLIP ViT-B/32, needs the `clip` feature
    Clip,
}

impl std::fmt::Display for EmbeddingModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingModelKind::Thumbnail => write!(f, "thumbnail"),
            EmbeddingModelKind::Clip => write!(f, "clip"),
        }
    }
}

/// Strategy-specific numbers behind a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScoreDetails {
    Text {
        from_len: usize,
        to_len: usize,
        inserted: usize,
        deleted: usize,
    },
    Pixel {
        mismatched: u64,
        total: u64,
    },
    Embedding {
        cosine: f64,
    },
    Structural {
        correlation: f64,
    },
    /// Failed comparisons carry no numbers
    None,
}

/// A rendered byproduct of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// PNG-encoded highlight mask for one page (1-based)
    DiffImage { page: usize, png: Vec<u8> },
    /// Unified-diff patch of the two texts
    Patch(String),
    /// HTML fragment with a side-by-side diff view
    Html(String),
}

/// Output of a single comparison
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Difference score, 0 means identical
    pub score: f64,
    pub details: ScoreDetails,
    /// Pages that took part
    pub pages: usize,
    pub artifacts: Vec<Artifact>,
}

/// Trait for comparison strategies
pub trait Comparator: Send + Sync {
    /// Compare two documents extracted with the same strategy
    fn compare(
        &self,
        from: &ExtractedDocument,
        to: &ExtractedDocument,
    ) -> Result<Comparison, CompareError>;

    /// Get the strategy kind
    fn kind(&self) -> ComparatorKind;

    /// Whether this comparator can consume what `extractor` produces
    fn accepts(&self, extractor: ExtractorKind) -> bool {
        self.kind().accepts(extractor)
    }
}

/// Page images of both documents, zipped page by page.
///
/// Fails if page counts differ or a page is not an image.
pub(crate) fn paired_images<'a>(
    comparator: ComparatorKind,
    from: &'a ExtractedDocument,
    to: &'a ExtractedDocument,
) -> Result<Vec<(&'a RgbaImage, &'a RgbaImage)>, CompareError> {
    if from.page_count() != to.page_count() {
        return Err(CompareError::PageCountMismatch {
            from: from.page_count(),
            to: to.page_count(),
        });
    }

    from.pages
        .iter()
        .zip(&to.pages)
        .map(|(a, b)| match (a.as_image(), b.as_image()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(CompareError::IncompatibleContent {
                comparator: comparator.to_string(),
                content: if a.as_image().is_none() {
                    a.variant_name().to_string()
                } else {
                    b.variant_name().to_string()
                },
            }),
        })
        .collect()
}

/// Fail with `DimensionMismatch` unless both pages have the same size
pub(crate) fn require_same_dimensions(
    page: usize,
    a: &RgbaImage,
    b: &RgbaImage,
) -> Result<(), CompareError> {
    if a.dimensions() != b.dimensions() {
        return Err(CompareError::DimensionMismatch {
            page,
            from: a.dimensions(),
            to: b.dimensions(),
        });
    }
    Ok(())
}
