//! Embedding similarity: cosine distance between per-page image vectors.

use super::{paired_images, Comparator, ComparatorKind, Comparison, ScoreDetails};
use crate::core::extract::ExtractedDocument;
use crate::error::{CompareError, EngineError};
use image::RgbaImage;
use std::sync::Arc;

/// Maps a page image to a fixed-length vector.
///
/// Models are loaded once before the run and shared by every worker,
/// so `embed` takes `&self`; implementations guard any mutable state.
pub trait EmbeddingModel: Send + Sync {
    /// Load weights or other heavy state
    fn load(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn embed(&self, image: &RgbaImage) -> Result<Vec<f32>, CompareError>;

    /// Release what `load` acquired
    fn unload(&self) {}

    fn name(&self) -> &str;
}

/// Cosine similarity of two embeddings.
///
/// `page` only labels the error when a vector has zero norm.
pub fn cosine_similarity(page: usize, a: &[f32], b: &[f32]) -> Result<f64, CompareError> {
    if a.len() != b.len() {
        return Err(CompareError::EmbeddingLength {
            from: a.len(),
            to: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(CompareError::DegenerateEmbedding { page });
    }

    // A single sqrt keeps identical vectors at exactly 1
    Ok((dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0))
}

/// Scores pages as `100 * (1 - cosine)` over the mean page cosine.
///
/// Opposed vectors reach 200.
pub struct EmbeddingComparator {
    model: Arc<dyn EmbeddingModel>,
}

impl EmbeddingComparator {
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Self {
        Self { model }
    }
}

impl Comparator for EmbeddingComparator {
    fn compare(
        &self,
        from: &ExtractedDocument,
        to: &ExtractedDocument,
    ) -> Result<Comparison, CompareError> {
        let pages = paired_images(self.kind(), from, to)?;

        let mut sum = 0.0;
        for (index, (a, b)) in pages.iter().enumerate() {
            let va = self.model.embed(a)?;
            let vb = self.model.embed(b)?;
            sum += cosine_similarity(index + 1, &va, &vb)?;
        }

        let cosine = if pages.is_empty() {
            1.0
        } else {
            sum / pages.len() as f64
        };

        Ok(Comparison {
            score: 100.0 * (1.0 - cosine),
            details: ScoreDetails::Embedding { cosine },
            pages: pages.len(),
            artifacts: Vec::new(),
        })
    }

    fn kind(&self) -> ComparatorKind {
        ComparatorKind::EmbeddingSimilarity
    }
}
