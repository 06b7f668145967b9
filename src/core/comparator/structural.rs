//! Structural similarity via normalized correlation.
//!
//! Both pages are reduced to grayscale intensities and compared with the
//! Pearson correlation coefficient, which is what template matching with
//! `TM_CCOEFF_NORMED` yields when template and image have the same size.

use super::{
    paired_images, require_same_dimensions, Comparator, ComparatorKind, Comparison, ScoreDetails,
};
use crate::core::extract::ExtractedDocument;
use crate::error::CompareError;
use image::{imageops, GrayImage};

/// Scores pages by how well their intensities correlate
#[derive(Debug, Clone, Default)]
pub struct StructuralComparator;

impl StructuralComparator {
    pub fn new() -> Self {
        Self
    }
}

/// Pearson correlation of two equally sized grayscale images.
///
/// A flat image has no variance, so correlation is undefined; it is
/// taken as 1.0 when both images are identical and 0.0 otherwise.
pub fn correlation_coefficient(a: &GrayImage, b: &GrayImage) -> f64 {
    let n = a.as_raw().len() as f64;
    if n == 0.0 {
        return 1.0;
    }

    let mean_a = a.as_raw().iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let mean_b = b.as_raw().iter().map(|&v| f64::from(v)).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_a = 0.0;
    let mut variance_b = 0.0;
    for (&va, &vb) in a.as_raw().iter().zip(b.as_raw()) {
        let da = f64::from(va) - mean_a;
        let db = f64::from(vb) - mean_b;
        covariance += da * db;
        variance_a += da * da;
        variance_b += db * db;
    }

    if variance_a == 0.0 || variance_b == 0.0 {
        return if a.as_raw() == b.as_raw() { 1.0 } else { 0.0 };
    }

    (covariance / (variance_a.sqrt() * variance_b.sqrt())).clamp(-1.0, 1.0)
}

impl Comparator for StructuralComparator {
    fn compare(
        &self,
        from: &ExtractedDocument,
        to: &ExtractedDocument,
    ) -> Result<Comparison, CompareError> {
        let pages = paired_images(self.kind(), from, to)?;

        let mut sum = 0.0;
        for (index, (a, b)) in pages.iter().enumerate() {
            require_same_dimensions(index + 1, a, b)?;
            if a.as_raw() == b.as_raw() {
                sum += 1.0;
                continue;
            }
            sum += correlation_coefficient(&imageops::grayscale(*a), &imageops::grayscale(*b));
        }

        let correlation = if pages.is_empty() {
            1.0
        } else {
            sum / pages.len() as f64
        };

        Ok(Comparison {
            score: 100.0 * (1.0 - correlation),
            details: ScoreDetails::Structural { correlation },
            pages: pages.len(),
            artifacts: Vec::new(),
        })
    }

    fn kind(&self) -> ComparatorKind {
        ComparatorKind::StructuralSimilarity
    }
}
