//! Event type definitions for progress reporting.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the comparison pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Pair discovery events
    Pairing(PairingEvent),
    /// Per-pair processing events
    Pair(PairEvent),
    /// Report writing events
    Report(ReportEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during pair discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PairingEvent {
    /// Listing of both directories has started
    Started { from: PathBuf, to: PathBuf },
    /// The two directories hold a different number of documents
    CountMismatch { from_count: usize, to_count: usize },
    /// Pairing completed
    Completed { total_pairs: usize },
}

/// Lifecycle of a single document pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairState {
    Discovered,
    Extracting,
    Comparing,
    Reported,
    /// Terminal; the pair is skipped and the run continues
    Failed(ErrorKind),
}

/// Events emitted while processing pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PairEvent {
    /// Processing of all pairs has started
    Started { total_pairs: usize },
    /// A pair moved to a new state
    StateChanged { pair_id: String, state: PairState },
    /// A pair finished (successfully or not)
    Progress(PairProgress),
    /// A pair failed; processing continues with the others
    Failed {
        pair_id: String,
        kind: ErrorKind,
        message: String,
    },
}

/// Progress information during pair processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairProgress {
    /// Number of pairs finished so far
    pub completed: usize,
    /// Total number of pairs
    pub total: usize,
    /// Pair that just finished
    pub pair_id: String,
    /// Failures so far
    pub failed: usize,
}

/// Events from the report writer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReportEvent {
    /// A row was appended to the report
    RowWritten { pair_id: String },
    /// An artifact file was written
    ArtifactWritten { path: PathBuf },
    /// The report was flushed and closed
    Closed { rows: usize, failures: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// The run moved from `Idle` to `Running`, or reached its final state
    RunStateChanged { state: RunState },
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline finished
    Completed { summary: PipelineSummary },
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Pairing,
    Acquiring,
    Comparing,
    Reporting,
}

/// Overall run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    /// At least one pair failed
    CompletedWithErrors,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Pairs discovered
    pub total_pairs: usize,
    /// Pairs compared and reported
    pub reported: usize,
    /// Pairs that failed
    pub failed: usize,
    /// Final run state
    pub state: RunState,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Pairing => write!(f, "Pairing"),
            PipelinePhase::Acquiring => write!(f, "Starting engines"),
            PipelinePhase::Comparing => write!(f, "Comparing"),
            PipelinePhase::Reporting => write!(f, "Reporting"),
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Completed => write!(f, "completed"),
            RunState::CompletedWithErrors => write!(f, "completed with errors"),
        }
    }
}
