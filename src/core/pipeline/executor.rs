//! Pipeline execution implementation.

use super::resources::{EngineOverrides, SharedResources};
use crate::core::comparator::{Comparator, ComparatorKind, EmbeddingModel, EmbeddingModelKind};
use crate::core::extract::{
    ContentExtractor, ExtractedDocument, ExtractorKind, OcrEngine, PageSelection, Rasterizer,
};
use crate::core::pairing::{CountMismatch, DocumentFilter, DocumentPair, PairFinder};
use crate::core::report::{
    write_text_dump, ComparisonResult, PairFailure, ReportOptions, ReportWriter,
};
use crate::error::{CompareToolError, ExtractError, ReportError};
use crate::events::{
    null_sender, Event, EventSender, PairEvent, PairProgress, PairState, PipelineEvent,
    PipelinePhase, PipelineSummary, RunState,
};
use crossbeam_channel::{bounded, Receiver};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

/// Successful results and failures
type Outcomes = (Vec<ComparisonResult>, Vec<ComparisonResult>);

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// Final run state
    pub state: RunState,
    /// Successful comparisons, artifacts stripped
    pub results: Vec<ComparisonResult>,
    /// Failed pairs with their error kind
    pub failures: Vec<ComparisonResult>,
    /// Pairs discovered
    pub total_pairs: usize,
    /// Set when the two directories hold a different number of documents
    pub count_mismatch: Option<CountMismatch>,
    /// Where the report was written
    pub report_dir: PathBuf,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory of reference documents
    pub from: PathBuf,
    /// Directory of documents to compare against
    pub to: PathBuf,
    /// Output directory
    pub result: PathBuf,
    pub extractor: ExtractorKind,
    pub comparator: ComparatorKind,
    pub pages: PageSelection,
    /// File name suffix of documents to pair (case-sensitive)
    pub extension: String,
    /// Size of the worker pool
    pub workers: usize,
    /// Embedded text without font markup
    pub only_diff_text: bool,
    /// OCR language models
    pub languages: Vec<String>,
    /// Rasterization resolution
    pub dpi: u32,
    /// Write per-pair HTML pages
    pub html: bool,
    /// Keep rendered pages and text dumps in the output directory
    pub keep_intermediate: bool,
    /// Sort report rows by pair id
    pub sort: bool,
    pub pixel_tolerance: u8,
    pub embedding_model: EmbeddingModelKind,
    pub pdftoppm_path: PathBuf,
    pub tesseract_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            from: PathBuf::new(),
            to: PathBuf::new(),
            result: PathBuf::new(),
            extractor: ExtractorKind::EmbeddedText,
            comparator: ComparatorKind::CharDiff,
            pages: PageSelection::First,
            extension: ".pdf".to_string(),
            workers: default_workers(),
            only_diff_text: false,
            languages: vec!["eng".to_string()],
            dpi: 150,
            html: false,
            keep_intermediate: false,
            sort: false,
            pixel_tolerance: 0,
            embedding_model: EmbeddingModelKind::Thumbnail,
            pdftoppm_path: PathBuf::from("pdftoppm"),
            tesseract_path: PathBuf::from("tesseract"),
        }
    }
}

impl PipelineConfig {
    /// Reject configurations that cannot run, before anything is touched
    pub fn validate(&self) -> Result<(), CompareToolError> {
        if !self.comparator.accepts(self.extractor) {
            return Err(CompareToolError::Config(format!(
                "comparator '{}' cannot use content from extractor '{}'",
                self.comparator, self.extractor
            )));
        }
        if self.workers == 0 {
            return Err(CompareToolError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.extension.is_empty() {
            return Err(CompareToolError::Config(
                "extension must not be empty".to_string(),
            ));
        }
        if self.extractor == ExtractorKind::Ocr && self.languages.is_empty() {
            return Err(CompareToolError::Config(
                "OCR needs at least one language".to_string(),
            ));
        }
        Ok(())
    }
}

/// Available parallelism, or 1 when it cannot be determined
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    overrides: EngineOverrides,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            overrides: EngineOverrides::default(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the input and output directories
    pub fn dirs(
        mut self,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        result: impl Into<PathBuf>,
    ) -> Self {
        self.config.from = from.into();
        self.config.to = to.into();
        self.config.result = result.into();
        self
    }

    /// Set the extraction and comparison strategies
    pub fn strategy(mut self, extractor: ExtractorKind, comparator: ComparatorKind) -> Self {
        self.config.extractor = extractor;
        self.config.comparator = comparator;
        self
    }

    /// Set the page selection
    pub fn pages(mut self, pages: PageSelection) -> Self {
        self.config.pages = pages;
        self
    }

    /// Set the worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Use this rasterizer instead of pdftoppm
    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.overrides.rasterizer = Some(rasterizer);
        self
    }

    /// Use this OCR engine instead of tesseract
    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.overrides.ocr_engine = Some(engine);
        self
    }

    /// Use this embedding model instead of the configured one
    pub fn embedding_model(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        self.overrides.embedding_model = Some(model);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            overrides: self.overrides,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a worker needs to process one pair
struct PairContext<'a> {
    extractor: Arc<dyn ContentExtractor>,
    comparator: Arc<dyn Comparator>,
    events: &'a EventSender,
}

/// The document pair comparison pipeline
pub struct Pipeline {
    config: PipelineConfig,
    overrides: EngineOverrides,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<PipelineResult, CompareToolError> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting.
    ///
    /// Fatal errors (bad configuration, missing directories, unavailable
    /// engines, unwritable output) abort the run. A pair that fails is
    /// recorded in the report and the run carries on.
    pub fn run_with_events(
        &self,
        events: &EventSender,
    ) -> Result<PipelineResult, CompareToolError> {
        let start_time = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::RunStateChanged {
            state: RunState::Idle,
        }));
        self.config.validate()?;

        events.send(Event::Pipeline(PipelineEvent::Started));
        events.send(Event::Pipeline(PipelineEvent::RunStateChanged {
            state: RunState::Running,
        }));

        let result = self.execute(events, start_time);
        if let Err(e) = &result {
            events.send(Event::Pipeline(PipelineEvent::Error {
                message: e.to_string(),
            }));
        }
        result
    }

    fn execute(
        &self,
        events: &EventSender,
        start_time: Instant,
    ) -> Result<PipelineResult, CompareToolError> {
        // Phase 1: Pairing
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Pairing,
        }));

        let finder =
            PairFinder::new(DocumentFilter::new(&self.config.extension)).sorted(self.config.sort);
        let pairing = finder.find_pairs_with_events(&self.config.from, &self.config.to, events)?;
        let count_mismatch = pairing.count_mismatch();
        let pairs = pairing.pairs;
        let total_pairs = pairs.len();
        for pair in &pairs {
            events.send(Event::Pair(PairEvent::StateChanged {
                pair_id: pair.id.clone(),
                state: PairState::Discovered,
            }));
        }

        // Phase 2: Acquiring shared engines
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Acquiring,
        }));

        let mut resources = SharedResources::acquire(&self.config, &self.overrides)?;
        let outcome = self.compare_all(&resources, &pairs, events);
        resources.shutdown();
        let (results, failures) = outcome?;

        let state = if failures.is_empty() {
            RunState::Completed
        } else {
            RunState::CompletedWithErrors
        };
        let duration_ms = start_time.elapsed().as_millis() as u64;

        tracing::info!(
            pairs = total_pairs,
            reported = results.len(),
            failed = failures.len(),
            duration_ms,
            "run finished"
        );

        events.send(Event::Pipeline(PipelineEvent::RunStateChanged { state }));
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                total_pairs,
                reported: results.len(),
                failed: failures.len(),
                state,
                duration_ms,
            },
        }));

        Ok(PipelineResult {
            state,
            results,
            failures,
            total_pairs,
            count_mismatch,
            report_dir: self.config.result.clone(),
            duration_ms,
        })
    }

    /// Fan out over the pairs and feed every outcome to a single writer
    fn compare_all(
        &self,
        resources: &SharedResources,
        pairs: &[DocumentPair],
        events: &EventSender,
    ) -> Result<Outcomes, CompareToolError> {
        let context = PairContext {
            extractor: resources.extractor(&self.config)?,
            comparator: resources.comparator(&self.config)?,
            events,
        };

        let options = ReportOptions {
            metric: self.config.comparator,
            html: self.config.html,
            sort_by_pair: self.config.sort,
            extractor: Some(self.config.extractor),
            pages: Some(self.config.pages),
        };
        let mut report =
            ReportWriter::open(&self.config.result, options)?.with_events(events.clone());

        // Phase 3: Comparing
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Comparing,
        }));
        events.send(Event::Pair(PairEvent::Started {
            total_pairs: pairs.len(),
        }));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|index| format!("compare-{}", index))
            .build()
            .map_err(|e| CompareToolError::Config(format!("cannot start worker pool: {}", e)))?;

        let (sender, receiver) = bounded::<ComparisonResult>(self.config.workers * 2);

        let collected = std::thread::scope(|scope| {
            let context = &context;
            scope.spawn(move || {
                pool.install(|| {
                    pairs.par_iter().for_each_with(sender, |sender, pair| {
                        // The writer hung up after a fatal error; drop the rest
                        let _ = sender.send(self.process_pair(pair, context));
                    });
                });
            });

            self.collect(receiver, &mut report, pairs.len(), events)
        });
        let (mut results, mut failures) = collected?;
        if self.config.sort {
            results.sort_by(|a, b| a.pair_id.cmp(&b.pair_id));
            failures.sort_by(|a, b| a.pair_id.cmp(&b.pair_id));
        }

        // Phase 4: Reporting
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Reporting,
        }));
        report.close()?;

        Ok((results, failures))
    }

    /// Writer loop; returns when every worker is done or a write fails
    fn collect(
        &self,
        receiver: Receiver<ComparisonResult>,
        report: &mut ReportWriter,
        total: usize,
        events: &EventSender,
    ) -> Result<Outcomes, ReportError> {
        let mut results = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for result in receiver.iter() {
            let summary = result.without_artifacts();
            report.append(result)?;

            let state = match &summary.error {
                Some(failure) => {
                    events.send(Event::Pair(PairEvent::Failed {
                        pair_id: summary.pair_id.clone(),
                        kind: failure.kind,
                        message: failure.message.clone(),
                    }));
                    PairState::Failed(failure.kind)
                }
                None => PairState::Reported,
            };
            events.send(Event::Pair(PairEvent::StateChanged {
                pair_id: summary.pair_id.clone(),
                state,
            }));

            let pair_id = summary.pair_id.clone();
            if summary.is_failure() {
                failures.push(summary);
            } else {
                results.push(summary);
            }

            events.send(Event::Pair(PairEvent::Progress(PairProgress {
                completed: results.len() + failures.len(),
                total,
                pair_id,
                failed: failures.len(),
            })));
        }

        Ok((results, failures))
    }

    /// Extract both sides concurrently, then compare
    fn process_pair(&self, pair: &DocumentPair, context: &PairContext<'_>) -> ComparisonResult {
        let metric = self.config.comparator;
        let change_state = |state: PairState| {
            context.events.send(Event::Pair(PairEvent::StateChanged {
                pair_id: pair.id.clone(),
                state,
            }));
        };

        change_state(PairState::Extracting);
        tracing::debug!(pair = %pair.id, "extracting");

        let (from, to) = rayon::join(
            || self.extract_side(context, pair, "from", &pair.path_from),
            || self.extract_side(context, pair, "to", &pair.path_to),
        );

        let (from, to) = match (from, to) {
            (Ok(from), Ok(to)) => (from, to),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(pair = %pair.id, error = %e, "extraction failed");
                let failure = PairFailure::new(e.kind(), e.to_string());
                return ComparisonResult::failure(&pair.id, metric, failure);
            }
        };

        change_state(PairState::Comparing);

        match context.comparator.compare(&from, &to) {
            Ok(comparison) => {
                tracing::debug!(pair = %pair.id, score = comparison.score, "compared");
                ComparisonResult::success(&pair.id, metric, comparison)
            }
            Err(e) => {
                tracing::warn!(pair = %pair.id, error = %e, "comparison failed");
                let failure = PairFailure::new(e.kind(), e.to_string());
                ComparisonResult::failure(&pair.id, metric, failure)
            }
        }
    }

    /// Extract one document in its own work directory
    fn extract_side(
        &self,
        context: &PairContext<'_>,
        pair: &DocumentPair,
        side: &str,
        pdf: &Path,
    ) -> Result<ExtractedDocument, ExtractError> {
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ExtractError::Io { path, source }
        };

        let document = if self.config.keep_intermediate {
            let workdir = self.config.result.join(side).join(&pair.id);
            std::fs::create_dir_all(&workdir).map_err(io_error(&workdir))?;
            context.extractor.extract(pdf, &workdir)?
        } else {
            let workdir = TempDir::new().map_err(io_error(pdf))?;
            context.extractor.extract(pdf, workdir.path())?
        };

        if self.config.keep_intermediate {
            if let Some(text) = document.text() {
                write_text_dump(&self.config.result, side, &pair.id, &text).map_err(|e| {
                    ExtractError::Io {
                        path: self.config.result.join(side),
                        source: std::io::Error::other(e.to_string()),
                    }
                })?;
            }
        }

        Ok(document)
    }
}
