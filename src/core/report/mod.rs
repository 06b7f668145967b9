//! # Report Module
//!
//! Persists comparison results into the output directory.
//!
//! ## Layout
//! ```text
//! <result>/
//!   results.csv          one row per compared pair
//!   errors.csv           one row per failed pair
//!   report.json          run manifest, written at close
//!   diff/<id>.patch      unified text patch
//!   diff/<id>.page-N.png pixel highlight mask
//!   <id>.html            side-by-side text diff
//! ```
//!
//! A single [`ReportWriter`] owns every file; workers hand it results
//! over a channel. Rows are flushed one at a time so an interrupted run
//! still leaves a readable partial report.

pub mod html;
mod rows;

pub use rows::{error_record, format_score, result_record, results_header, ERRORS_HEADER};

use crate::core::comparator::{Artifact, ComparatorKind, Comparison, ScoreDetails};
use crate::core::extract::{ExtractorKind, PageSelection};
use crate::error::{ErrorKind, ReportError};
use crate::events::{Event, EventSender, ReportEvent, RunState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const RESULTS_FILE: &str = "results.csv";
pub const ERRORS_FILE: &str = "errors.csv";
pub const MANIFEST_FILE: &str = "report.json";
pub const DIFF_DIR: &str = "diff";

/// Why a pair produced no score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl PairFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of comparing one pair, immutable once created
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub pair_id: String,
    pub metric: ComparatorKind,
    pub score: f64,
    pub details: ScoreDetails,
    pub pages: usize,
    pub artifacts: Vec<Artifact>,
    pub error: Option<PairFailure>,
}

impl ComparisonResult {
    pub fn success(
        pair_id: impl Into<String>,
        metric: ComparatorKind,
        comparison: Comparison,
    ) -> Self {
        Self {
            pair_id: pair_id.into(),
            metric,
            score: comparison.score,
            details: comparison.details,
            pages: comparison.pages,
            artifacts: comparison.artifacts,
            error: None,
        }
    }

    pub fn failure(
        pair_id: impl Into<String>,
        metric: ComparatorKind,
        failure: PairFailure,
    ) -> Self {
        Self {
            pair_id: pair_id.into(),
            metric,
            score: 0.0,
            details: ScoreDetails::None,
            pages: 0,
            artifacts: Vec::new(),
            error: Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Copy without the (possibly large) artifact payloads
    pub fn without_artifacts(&self) -> Self {
        Self {
            pair_id: self.pair_id.clone(),
            metric: self.metric,
            score: self.score,
            details: self.details.clone(),
            pages: self.pages,
            artifacts: Vec::new(),
            error: self.error.clone(),
        }
    }
}

/// Report writer options
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Comparator whose layout `results.csv` uses
    pub metric: ComparatorKind,
    /// Write `<id>.html` pages for HTML artifacts
    pub html: bool,
    /// Buffer rows and write them sorted by pair id at close
    pub sort_by_pair: bool,
    /// Recorded in the manifest only
    pub extractor: Option<ExtractorKind>,
    pub pages: Option<PageSelection>,
}

impl ReportOptions {
    pub fn new(metric: ComparatorKind) -> Self {
        Self {
            metric,
            html: false,
            sort_by_pair: false,
            extractor: None,
            pages: None,
        }
    }
}

/// Run manifest stored as `report.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<ExtractorKind>,
    pub metric: ComparatorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<PageSelection>,
    pub rows: usize,
    pub failures: usize,
    pub artifacts: usize,
    pub state: RunState,
}

/// What `close` leaves behind
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub manifest: ReportManifest,
    pub results_path: PathBuf,
    pub errors_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// A row waiting for `close` when sorting is enabled
struct PendingRow {
    pair_id: String,
    record: Vec<String>,
    failure: bool,
}

/// Append-only writer for one run's report
pub struct ReportWriter {
    dir: PathBuf,
    options: ReportOptions,
    results: csv::Writer<BufWriter<File>>,
    errors: csv::Writer<BufWriter<File>>,
    seen: HashSet<(String, ComparatorKind)>,
    pending: Vec<PendingRow>,
    rows: usize,
    failures: usize,
    artifacts: usize,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    events: Option<EventSender>,
}

impl ReportWriter {
    /// Create the output directory and both CSV files with their headers
    pub fn open(dir: impl Into<PathBuf>, options: ReportOptions) -> Result<Self, ReportError> {
        let dir = dir.into();
        create_dir(&dir)?;

        let mut results = csv_writer(&dir.join(RESULTS_FILE))?;
        write_record(&mut results, &dir.join(RESULTS_FILE), results_header(options.metric))?;

        let mut errors = csv_writer(&dir.join(ERRORS_FILE))?;
        write_record(&mut errors, &dir.join(ERRORS_FILE), &ERRORS_HEADER)?;

        tracing::debug!(dir = %dir.display(), metric = %options.metric, "report opened");

        Ok(Self {
            dir,
            options,
            results,
            errors,
            seen: HashSet::new(),
            pending: Vec::new(),
            rows: 0,
            failures: 0,
            artifacts: 0,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            events: None,
        })
    }

    /// Publish `Report` events on this sender
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Record one result.
    ///
    /// Successful results become a `results.csv` row plus their artifact
    /// files; failures become an `errors.csv` row. Each `(pair, metric)`
    /// may be appended once.
    pub fn append(&mut self, result: ComparisonResult) -> Result<(), ReportError> {
        let key = (result.pair_id.clone(), result.metric);
        if self.seen.contains(&key) {
            return Err(ReportError::DuplicateRow {
                pair_id: result.pair_id,
                metric: result.metric.to_string(),
            });
        }

        let failure = result.is_failure();
        let record = if failure {
            error_record(&result)
        } else {
            result_record(&result)
        };

        if !failure {
            for artifact in &result.artifacts {
                self.write_artifact(&result, artifact)?;
            }
        }

        if self.options.sort_by_pair {
            self.pending.push(PendingRow {
                pair_id: result.pair_id.clone(),
                record,
                failure,
            });
        } else {
            self.write_row(failure, &record)?;
        }

        if failure {
            self.failures += 1;
        } else {
            self.rows += 1;
        }
        self.seen.insert(key);
        self.emit(ReportEvent::RowWritten {
            pair_id: result.pair_id,
        });

        Ok(())
    }

    /// Flush buffered rows and write the manifest
    pub fn close(mut self) -> Result<ReportSummary, ReportError> {
        if self.options.sort_by_pair {
            let mut pending = std::mem::take(&mut self.pending);
            pending.sort_by(|a, b| a.pair_id.cmp(&b.pair_id));
            for row in &pending {
                self.write_row(row.failure, &row.record)?;
            }
        }

        let results_path = self.dir.join(RESULTS_FILE);
        let errors_path = self.dir.join(ERRORS_FILE);
        self.results.flush().map_err(|source| ReportError::Write {
            path: results_path.clone(),
            source,
        })?;
        self.errors.flush().map_err(|source| ReportError::Write {
            path: errors_path.clone(),
            source,
        })?;

        let manifest = ReportManifest {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            extractor: self.options.extractor,
            metric: self.options.metric,
            pages: self.options.pages,
            rows: self.rows,
            failures: self.failures,
            artifacts: self.artifacts,
            state: if self.failures > 0 {
                RunState::CompletedWithErrors
            } else {
                RunState::Completed
            },
        };

        let manifest_path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| ReportError::Manifest(e.to_string()))?;
        std::fs::write(&manifest_path, json).map_err(|source| ReportError::Write {
            path: manifest_path.clone(),
            source,
        })?;

        tracing::info!(
            rows = manifest.rows,
            failures = manifest.failures,
            "report closed"
        );
        self.emit(ReportEvent::Closed {
            rows: manifest.rows,
            failures: manifest.failures,
        });

        Ok(ReportSummary {
            manifest,
            results_path,
            errors_path,
            manifest_path,
        })
    }

    fn write_row(&mut self, failure: bool, record: &[String]) -> Result<(), ReportError> {
        let (writer, file) = if failure {
            (&mut self.errors, ERRORS_FILE)
        } else {
            (&mut self.results, RESULTS_FILE)
        };
        let path = self.dir.join(file);
        write_record(writer, &path, record)?;
        writer
            .flush()
            .map_err(|source| ReportError::Write { path, source })
    }

    fn write_artifact(
        &mut self,
        result: &ComparisonResult,
        artifact: &Artifact,
    ) -> Result<(), ReportError> {
        let id = &result.pair_id;
        let path = match artifact {
            Artifact::DiffImage { page, png } => {
                let path = self.diff_dir()?.join(format!("{}.page-{}.png", id, page));
                write_file(&path, png)?;
                path
            }
            Artifact::Patch(patch) => {
                let path = self.diff_dir()?.join(format!("{}.patch", id));
                write_file(&path, patch.as_bytes())?;
                path
            }
            Artifact::Html(fragment) => {
                if !self.options.html {
                    return Ok(());
                }
                let path = self.dir.join(format!("{}.html", id));
                let subtitle = format!("{}: {}%", result.metric, format_score(result.score));
                let file = File::create(&path).map_err(|source| ReportError::Write {
                    path: path.clone(),
                    source,
                })?;
                html::write_page(BufWriter::new(file), id, &subtitle, fragment).map_err(
                    |source| ReportError::Write {
                        path: path.clone(),
                        source,
                    },
                )?;
                path
            }
        };

        self.artifacts += 1;
        self.emit(ReportEvent::ArtifactWritten { path });
        Ok(())
    }

    fn diff_dir(&self) -> Result<PathBuf, ReportError> {
        let dir = self.dir.join(DIFF_DIR);
        create_dir(&dir)?;
        Ok(dir)
    }

    fn emit(&self, event: ReportEvent) {
        if let Some(events) = &self.events {
            events.send(Event::Report(event));
        }
    }
}

/// Write an extracted-text dump to `<dir>/<side>/<pair_id>.txt`
pub fn write_text_dump(
    dir: &Path,
    side: &str,
    pair_id: &str,
    text: &str,
) -> Result<PathBuf, ReportError> {
    let side_dir = dir.join(side);
    create_dir(&side_dir)?;
    let path = side_dir.join(format!("{}.txt", pair_id));
    write_file(&path, text.as_bytes())?;
    Ok(path)
}

fn create_dir(dir: &Path) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::CreateDirectory {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    std::fs::write(path, bytes).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>, ReportError> {
    let file = File::create(path).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::Writer::from_writer(BufWriter::new(file)))
}

fn write_record<I, T>(
    writer: &mut csv::Writer<BufWriter<File>>,
    path: &Path,
    record: I,
) -> Result<(), ReportError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    writer.write_record(record).map_err(|source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    })
}
