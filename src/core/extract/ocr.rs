//! OCR text extraction.
//!
//! Pages are rendered by the rasterizer, then recognized by a shared
//! [`OcrEngine`]. The default engine drives the `tesseract` CLI and reads
//! its TSV output so word confidences are available.

use super::raster::{RasterExtractor, Rasterizer};
use super::{ContentExtractor, ExtractedContent, ExtractedDocument, ExtractorKind, PageSelection};
use crate::error::{EngineError, ExtractError};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Text recognized on one page
#[derive(Debug, Clone, PartialEq)]
pub struct OcrPage {
    pub text: String,
    /// Mean word confidence (0-100), `None` when no word was scored
    pub confidence: Option<f32>,
}

/// An OCR engine with a process-wide lifecycle.
///
/// `initialize` loads language data once before any page is recognized;
/// `shutdown` releases it after the run. Between the two calls the engine
/// is shared read-only by all workers.
pub trait OcrEngine: Send + Sync {
    fn initialize(&self) -> Result<(), EngineError>;

    fn recognize(&self, image: &Path) -> Result<OcrPage, ExtractError>;

    fn shutdown(&self);
}

/// OCR engine backed by the `tesseract` command-line tool
#[derive(Debug)]
pub struct TesseractEngine {
    binary: PathBuf,
    languages: Vec<String>,
    ready: AtomicBool,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<PathBuf>, languages: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            languages,
            ready: AtomicBool::new(false),
        }
    }

    fn language_arg(&self) -> String {
        self.languages.join("+")
    }

    /// Languages reported by `tesseract --list-langs`
    fn installed_languages(&self) -> Result<Vec<String>, EngineError> {
        let output = Command::new(&self.binary)
            .arg("--list-langs")
            .output()
            .map_err(|e| EngineError::Unavailable {
                tool: self.binary.display().to_string(),
                reason: e.to_string(),
            })?;

        // Older releases print the list on stderr
        let listing = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
            .map(str::to_string)
            .collect())
    }
}

impl OcrEngine for TesseractEngine {
    fn initialize(&self) -> Result<(), EngineError> {
        let installed = self.installed_languages()?;
        let missing: Vec<String> = self
            .languages
            .iter()
            .filter(|lang| !installed.contains(lang))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(EngineError::LanguageUnavailable { missing });
        }

        self.ready.store(true, Ordering::SeqCst);
        tracing::info!(languages = %self.language_arg(), "tesseract ready");
        Ok(())
    }

    fn recognize(&self, image: &Path) -> Result<OcrPage, ExtractError> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(ExtractError::Recognition {
                path: image.to_path_buf(),
                reason: "OCR engine is not initialized".to_string(),
            });
        }

        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(self.language_arg())
            .arg("tsv")
            .output()
            .map_err(|e| ExtractError::Recognition {
                path: image.to_path_buf(),
                reason: format!("failed to run {}: {}", self.binary.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Recognition {
                path: image.to_path_buf(),
                reason: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }

        parse_tesseract_tsv(&String::from_utf8_lossy(&output.stdout)).map_err(|reason| {
            ExtractError::Recognition {
                path: image.to_path_buf(),
                reason,
            }
        })
    }

    fn shutdown(&self) {
        if self.ready.swap(false, Ordering::SeqCst) {
            tracing::debug!("tesseract released");
        }
    }
}

/// Rebuild page text from tesseract TSV output.
///
/// Words on one line are joined by spaces, lines by `\n`, and a new
/// block or paragraph starts after a blank line. The confidence is the
/// mean over words with a non-negative score.
pub fn parse_tesseract_tsv(tsv: &str) -> Result<OcrPage, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(tsv.as_bytes());

    let mut text = String::new();
    let mut last_line: Option<(u32, u32, u32)> = None;
    let mut confidence_sum = 0.0f32;
    let mut scored_words = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| format!("malformed TSV: {}", e))?;

        // level 5 rows are words
        if record.get(0) != Some("5") {
            continue;
        }

        let word = record.get(11).unwrap_or("").trim();
        if word.is_empty() {
            continue;
        }

        let field = |index: usize| -> u32 {
            record.get(index).and_then(|v| v.parse().ok()).unwrap_or(0)
        };
        let line = (field(2), field(3), field(4));

        match last_line {
            None => {}
            Some((block, par, _)) if (block, par) != (line.0, line.1) => text.push_str("\n\n"),
            Some(previous) if previous != line => text.push('\n'),
            Some(_) => text.push(' '),
        }
        text.push_str(word);
        last_line = Some(line);

        if let Some(conf) = record.get(10).and_then(|v| v.parse::<f32>().ok()) {
            if conf >= 0.0 {
                confidence_sum += conf;
                scored_words += 1;
            }
        }
    }

    Ok(OcrPage {
        text,
        confidence: (scored_words > 0).then(|| confidence_sum / scored_words as f32),
    })
}

/// OCR extraction strategy: rasterize, then recognize each page
pub struct OcrExtractor {
    raster: RasterExtractor,
    engine: Arc<dyn OcrEngine>,
}

impl OcrExtractor {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        engine: Arc<dyn OcrEngine>,
        pages: PageSelection,
    ) -> Self {
        Self {
            raster: RasterExtractor::new(rasterizer, pages),
            engine,
        }
    }
}

impl ContentExtractor for OcrExtractor {
    fn extract(&self, pdf: &Path, workdir: &Path) -> Result<ExtractedDocument, ExtractError> {
        let paths = self.raster.render_paths(pdf, workdir)?;

        let pages = paths
            .iter()
            .map(|path| {
                self.engine.recognize(path).map(|page| ExtractedContent::OcrText {
                    text: page.text,
                    confidence: page.confidence,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| match e {
                ExtractError::Recognition { reason, .. } => ExtractError::Recognition {
                    path: pdf.to_path_buf(),
                    reason,
                },
                other => other,
            })?;

        Ok(ExtractedDocument::new(pdf, pages))
    }

    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Ocr
    }
}
