//! Engines shared by every worker for the length of one run.

use super::PipelineConfig;
use crate::core::comparator::{
    CharDiffComparator, Comparator, ComparatorKind, EmbeddingComparator, EmbeddingModel,
    EmbeddingModelKind, PixelDiffComparator, StructuralComparator, ThumbnailEmbedder,
};
use crate::core::extract::{
    ContentExtractor, EmbeddedTextExtractor, ExtractorKind, OcrEngine, OcrExtractor,
    PdftoppmRasterizer, RasterExtractor, Rasterizer, TesseractEngine,
};
use crate::error::EngineError;
use std::sync::Arc;

/// Engines injected instead of the defaults built from the config
#[derive(Default, Clone)]
pub struct EngineOverrides {
    pub rasterizer: Option<Arc<dyn Rasterizer>>,
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,
    pub embedding_model: Option<Arc<dyn EmbeddingModel>>,
}

/// Rasterizer, OCR engine and embedding model, acquired once per run.
///
/// Only the engines the configured strategies need are acquired. Call
/// [`SharedResources::shutdown`] once every worker is done.
pub struct SharedResources {
    rasterizer: Option<Arc<dyn Rasterizer>>,
    ocr: Option<Arc<dyn OcrEngine>>,
    embedding: Option<Arc<dyn EmbeddingModel>>,
}

impl SharedResources {
    /// Check, initialize and load what `config` needs.
    ///
    /// Any failure here is fatal for the run; engines already started
    /// are shut down again before returning the error.
    pub fn acquire(
        config: &PipelineConfig,
        overrides: &EngineOverrides,
    ) -> Result<Self, EngineError> {
        let mut resources = Self {
            rasterizer: None,
            ocr: None,
            embedding: None,
        };

        if config.extractor.needs_rasterizer() {
            let rasterizer = overrides.rasterizer.clone().unwrap_or_else(|| {
                Arc::new(PdftoppmRasterizer::new(&config.pdftoppm_path, config.dpi))
            });
            rasterizer.check_available()?;
            tracing::debug!(rasterizer = rasterizer.name(), "rasterizer available");
            resources.rasterizer = Some(rasterizer);
        }

        if config.extractor == ExtractorKind::Ocr {
            let engine = overrides.ocr_engine.clone().unwrap_or_else(|| {
                Arc::new(TesseractEngine::new(
                    &config.tesseract_path,
                    config.languages.clone(),
                ))
            });
            if let Err(e) = engine.initialize() {
                resources.shutdown();
                return Err(e);
            }
            resources.ocr = Some(engine);
        }

        if config.comparator == ComparatorKind::EmbeddingSimilarity {
            let model = match overrides.embedding_model.clone() {
                Some(model) => model,
                None => match default_model(config.embedding_model) {
                    Ok(model) => model,
                    Err(e) => {
                        resources.shutdown();
                        return Err(e);
                    }
                },
            };
            if let Err(e) = model.load() {
                resources.shutdown();
                return Err(e);
            }
            tracing::debug!(model = model.name(), "embedding model loaded");
            resources.embedding = Some(model);
        }

        Ok(resources)
    }

    /// The extraction strategy for this run
    pub fn extractor(
        &self,
        config: &PipelineConfig,
    ) -> Result<Arc<dyn ContentExtractor>, EngineError> {
        let extractor: Arc<dyn ContentExtractor> = match config.extractor {
            ExtractorKind::Raster => {
                Arc::new(RasterExtractor::new(self.rasterizer()?, config.pages))
            }
            ExtractorKind::Ocr => {
                let engine = self.ocr.clone().ok_or_else(|| not_acquired("OCR engine"))?;
                Arc::new(OcrExtractor::new(self.rasterizer()?, engine, config.pages))
            }
            ExtractorKind::EmbeddedText => Arc::new(
                EmbeddedTextExtractor::new(config.pages).only_diff_text(config.only_diff_text),
            ),
        };
        Ok(extractor)
    }

    /// The comparison strategy for this run
    pub fn comparator(&self, config: &PipelineConfig) -> Result<Arc<dyn Comparator>, EngineError> {
        let comparator: Arc<dyn Comparator> = match config.comparator {
            ComparatorKind::PixelDiff => Arc::new(PixelDiffComparator::new(config.pixel_tolerance)),
            ComparatorKind::EmbeddingSimilarity => {
                let model = self
                    .embedding
                    .clone()
                    .ok_or_else(|| not_acquired("embedding model"))?;
                Arc::new(EmbeddingComparator::new(model))
            }
            ComparatorKind::StructuralSimilarity => Arc::new(StructuralComparator::new()),
            ComparatorKind::CharDiff => Arc::new(CharDiffComparator::new().with_html(config.html)),
        };
        Ok(comparator)
    }

    /// Release engines in reverse order of acquisition
    pub fn shutdown(&mut self) {
        if let Some(model) = self.embedding.take() {
            model.unload();
        }
        if let Some(engine) = self.ocr.take() {
            engine.shutdown();
        }
        self.rasterizer = None;
    }

    fn rasterizer(&self) -> Result<Arc<dyn Rasterizer>, EngineError> {
        self.rasterizer.clone().ok_or_else(|| not_acquired("rasterizer"))
    }
}

fn not_acquired(what: &str) -> EngineError {
    EngineError::Unavailable {
        tool: what.to_string(),
        reason: "not acquired for this run".to_string(),
    }
}

fn default_model(kind: EmbeddingModelKind) -> Result<Arc<dyn EmbeddingModel>, EngineError> {
    match kind {
        EmbeddingModelKind::Thumbnail => Ok(Arc::new(ThumbnailEmbedder::default())),
        #[cfg(feature = "clip")]
        EmbeddingModelKind::Clip => Ok(Arc::new(crate::core::comparator::ClipEmbedder::new())),
        #[cfg(not(feature = "clip"))]
        EmbeddingModelKind::Clip => Err(EngineError::ModelLoad(
            "this build has no CLIP support; rebuild with `--features clip`".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extract::{OcrPage, PageSelection};
    use crate::error::ExtractError;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MissingRasterizer;

    impl Rasterizer for MissingRasterizer {
        fn render(
            &self,
            pdf: &Path,
            _: PageSelection,
            _: &Path,
        ) -> Result<Vec<PathBuf>, ExtractError> {
            Err(ExtractError::Conversion {
                path: pdf.to_path_buf(),
                reason: "unused".to_string(),
            })
        }

        fn check_available(&self) -> Result<(), EngineError> {
            Err(EngineError::Unavailable {
                tool: "fake".to_string(),
                reason: "not installed".to_string(),
            })
        }

        fn name(&self) -> &str {
            "missing"
        }
    }

    #[derive(Default)]
    struct TrackedEngine {
        up: AtomicBool,
    }

    impl OcrEngine for TrackedEngine {
        fn initialize(&self) -> Result<(), EngineError> {
            self.up.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn recognize(&self, _: &Path) -> Result<OcrPage, ExtractError> {
            Ok(OcrPage {
                text: String::new(),
                confidence: None,
            })
        }

        fn shutdown(&self) {
            self.up.store(false, Ordering::SeqCst);
        }
    }

    struct OkRasterizer;

    impl Rasterizer for OkRasterizer {
        fn render(
            &self,
            _: &Path,
            _: PageSelection,
            _: &Path,
        ) -> Result<Vec<PathBuf>, ExtractError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "ok"
        }
    }

    fn config(extractor: ExtractorKind, comparator: ComparatorKind) -> PipelineConfig {
        PipelineConfig {
            extractor,
            comparator,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn embedded_text_needs_no_engines() {
        let config = config(ExtractorKind::EmbeddedText, ComparatorKind::CharDiff);
        let resources = SharedResources::acquire(&config, &EngineOverrides::default()).unwrap();

        assert!(resources.rasterizer.is_none());
        assert!(resources.ocr.is_none());
        assert_eq!(resources.extractor(&config).unwrap().kind(), ExtractorKind::EmbeddedText);
        assert_eq!(resources.comparator(&config).unwrap().kind(), ComparatorKind::CharDiff);
    }

    #[test]
    fn unavailable_rasterizer_is_fatal() {
        let config = config(ExtractorKind::Raster, ComparatorKind::PixelDiff);
        let overrides = EngineOverrides {
            rasterizer: Some(Arc::new(MissingRasterizer)),
            ..EngineOverrides::default()
        };

        let result = SharedResources::acquire(&config, &overrides);

        assert!(matches!(result, Err(EngineError::Unavailable { .. })));
    }

    #[test]
    fn ocr_engine_is_initialized_and_shut_down() {
        let config = config(ExtractorKind::Ocr, ComparatorKind::CharDiff);
        let engine = Arc::new(TrackedEngine::default());
        let overrides = EngineOverrides {
            rasterizer: Some(Arc::new(OkRasterizer)),
            ocr_engine: Some(engine.clone()),
            ..EngineOverrides::default()
        };

        let mut resources = SharedResources::acquire(&config, &overrides).unwrap();
        assert!(engine.up.load(Ordering::SeqCst));
        assert_eq!(resources.extractor(&config).unwrap().kind(), ExtractorKind::Ocr);

        resources.shutdown();
        assert!(!engine.up.load(Ordering::SeqCst));
    }

    #[test]
    fn thumbnail_model_is_the_default() {
        let config = config(ExtractorKind::Raster, ComparatorKind::EmbeddingSimilarity);
        let overrides = EngineOverrides {
            rasterizer: Some(Arc::new(OkRasterizer)),
            ..EngineOverrides::default()
        };

        let resources = SharedResources::acquire(&config, &overrides).unwrap();

        assert_eq!(resources.embedding.as_ref().unwrap().name(), "thumbnail");
    }
}
