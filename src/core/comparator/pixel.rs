//! Pixel-exact comparison with a highlight mask per page.

use super::{
    paired_images, require_same_dimensions, Artifact, Comparator, ComparatorKind, Comparison,
    ScoreDetails,
};
use crate::core::extract::ExtractedDocument;
use crate::error::CompareError;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Color used to mark differing pixels in the diff mask
pub const HIGHLIGHT: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Counts pixels whose channels differ by more than a tolerance
#[derive(Debug, Clone, Default)]
pub struct PixelDiffComparator {
    /// Largest per-channel difference still counted as equal
    tolerance: u8,
}

impl PixelDiffComparator {
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }

    /// Mismatch count and highlight mask for one page pair.
    ///
    /// The mask is the `from` page with differing pixels painted over.
    fn diff_page(&self, a: &RgbaImage, b: &RgbaImage) -> (u64, RgbaImage) {
        let mut mask = a.clone();
        let mut mismatched = 0u64;

        for ((x, y, pa), pb) in a.enumerate_pixels().zip(b.pixels()) {
            let differs = pa
                .0
                .iter()
                .zip(pb.0.iter())
                .any(|(ca, cb)| ca.abs_diff(*cb) > self.tolerance);

            if differs {
                mismatched += 1;
                mask.put_pixel(x, y, HIGHLIGHT);
            }
        }

        (mismatched, mask)
    }
}

impl Comparator for PixelDiffComparator {
    fn compare(
        &self,
        from: &ExtractedDocument,
        to: &ExtractedDocument,
    ) -> Result<Comparison, CompareError> {
        let pages = paired_images(self.kind(), from, to)?;

        let mut mismatched = 0u64;
        let mut total = 0u64;
        let mut artifacts = Vec::with_capacity(pages.len());

        for (index, (a, b)) in pages.iter().enumerate() {
            let page = index + 1;
            require_same_dimensions(page, a, b)?;

            let (page_mismatched, mask) = self.diff_page(a, b);
            mismatched += page_mismatched;
            total += u64::from(a.width()) * u64::from(a.height());

            let mut png = Vec::new();
            mask.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| CompareError::Encode(e.to_string()))?;
            artifacts.push(Artifact::DiffImage { page, png });
        }

        let score = if total == 0 {
            0.0
        } else {
            100.0 * mismatched as f64 / total as f64
        };

        Ok(Comparison {
            score,
            details: ScoreDetails::Pixel { mismatched, total },
            pages: pages.len(),
            artifacts,
        })
    }

    fn kind(&self) -> ComparatorKind {
        ComparatorKind::PixelDiff
    }
}
