//! # Extract Module
//!
//! Converts a PDF into content that a comparator can score.
//!
//! ## Strategies
//! - **Raster** - render pages to images through an external rasterizer
//! - **OCR** - render pages, then recognize their text with an OCR engine
//! - **Embedded text** - read the PDF text layer directly
//!
//! One strategy is selected per run. Every strategy honours the same
//! [`PageSelection`], so first-page and all-pages runs are explicit.
//!
//! ## Example
//! ```rust,ignore
//! let extractor = EmbeddedTextExtractor::new(PageSelection::All).only_diff_text(true);
//! let document = extractor.extract(Path::new("from/doc1.pdf"), workdir.path())?;
//! println!("{}", document.text().unwrap_or_default());
//! ```

mod ocr;
mod raster;
mod text_layer;

pub use ocr::{parse_tesseract_tsv, OcrEngine, OcrExtractor, OcrPage, TesseractEngine};
pub use raster::{PdftoppmRasterizer, RasterExtractor, Rasterizer};
pub use text_layer::{EmbeddedTextExtractor, TextItem};

use crate::error::ExtractError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Comparable content of one page
#[derive(Debug, Clone)]
pub enum ExtractedContent {
    /// Rendered page pixels (width and height live in the buffer)
    RasterImage(RgbaImage),
    /// Text recognized by OCR, with the mean word confidence when known
    OcrText {
        text: String,
        confidence: Option<f32>,
    },
    /// Text read from the PDF text layer
    EmbeddedText(String),
}

impl ExtractedContent {
    /// Short name used in error messages
    pub fn variant_name(&self) -> &'static str {
        match self {
            ExtractedContent::RasterImage(_) => "raster image",
            ExtractedContent::OcrText { .. } => "OCR text",
            ExtractedContent::EmbeddedText(_) => "embedded text",
        }
    }

    /// Text of this page, if it holds text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExtractedContent::OcrText { text, .. } => Some(text),
            ExtractedContent::EmbeddedText(text) => Some(text),
            ExtractedContent::RasterImage(_) => None,
        }
    }

    /// Pixels of this page, if it holds an image
    pub fn as_image(&self) -> Option<&RgbaImage> {
        match self {
            ExtractedContent::RasterImage(image) => Some(image),
            _ => None,
        }
    }
}

/// Extracted content of one document, page by page
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// The PDF the content came from
    pub source: PathBuf,
    /// Content of each selected page, in page order
    pub pages: Vec<ExtractedContent>,
}

impl ExtractedDocument {
    pub fn new(source: impl Into<PathBuf>, pages: Vec<ExtractedContent>) -> Self {
        Self {
            source: source.into(),
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whole-document text, pages joined by newlines.
    ///
    /// `None` if any page is not text.
    pub fn text(&self) -> Option<String> {
        let texts: Option<Vec<&str>> = self.pages.iter().map(ExtractedContent::as_text).collect();
        texts.map(|t| t.join("\n"))
    }

    /// Mean OCR confidence over the pages that report one
    pub fn confidence(&self) -> Option<f32> {
        let values: Vec<f32> = self
            .pages
            .iter()
            .filter_map(|page| match page {
                ExtractedContent::OcrText { confidence, .. } => *confidence,
                _ => None,
            })
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f32>() / values.len() as f32)
        }
    }

    /// Name of the first page's variant, or "empty"
    pub fn content_name(&self) -> &'static str {
        self.pages
            .first()
            .map(ExtractedContent::variant_name)
            .unwrap_or("empty")
    }
}

/// Which pages of each document take part in the comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageSelection {
    /// Only page 1
    #[default]
    First,
    /// Every page, compared page by page
    All,
}

impl PageSelection {
    /// Maximum number of pages to take, `None` for all
    pub fn limit(&self) -> Option<usize> {
        match self {
            PageSelection::First => Some(1),
            PageSelection::All => None,
        }
    }
}

impl std::fmt::Display for PageSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageSelection::First => write!(f, "first"),
            PageSelection::All => write!(f, "all"),
        }
    }
}

/// Available extraction strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorKind {
    Raster,
    Ocr,
    EmbeddedText,
}

impl ExtractorKind {
    /// Whether this strategy produces text (as opposed to images)
    pub fn produces_text(&self) -> bool {
        matches!(self, ExtractorKind::Ocr | ExtractorKind::EmbeddedText)
    }

    /// Whether this strategy needs the external rasterizer
    pub fn needs_rasterizer(&self) -> bool {
        matches!(self, ExtractorKind::Raster | ExtractorKind::Ocr)
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractorKind::Raster => write!(f, "raster"),
            ExtractorKind::Ocr => write!(f, "ocr"),
            ExtractorKind::EmbeddedText => write!(f, "embedded-text"),
        }
    }
}

/// Trait for extraction strategies
pub trait ContentExtractor: Send + Sync {
    /// Extract comparable content from `pdf`.
    ///
    /// `workdir` is a private scratch directory for intermediate files
    /// (rendered pages); strategies that need none ignore it.
    fn extract(&self, pdf: &Path, workdir: &Path) -> Result<ExtractedDocument, ExtractError>;

    /// Get the strategy kind
    fn kind(&self) -> ExtractorKind;
}
