//! # Error Module
//!
//! Error types for the PDF pair comparison tool.
//!
//! ## Design Principles
//! - **Never panic** on user documents - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Scope failures** - a broken pair is recorded, the run continues
//! - **Recovery hints** - suggest how to fix when possible

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CompareToolError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("External engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while discovering document pairs
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while turning a PDF into comparable content
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to rasterize {path}: {reason}")]
    Conversion { path: PathBuf, reason: String },

    #[error("Text recognition failed for {path}: {reason}")]
    Recognition { path: PathBuf, reason: String },

    #[error("Cannot read text layer of {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by comparators
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Image dimensions differ: {}x{} vs {}x{} (page {page})", from.0, from.1, to.0, to.1)]
    DimensionMismatch {
        page: usize,
        from: (u32, u32),
        to: (u32, u32),
    },

    #[error("Page counts differ: {from} vs {to}")]
    PageCountMismatch { from: usize, to: usize },

    #[error("Embedding has zero norm (page {page}); cosine similarity is undefined")]
    DegenerateEmbedding { page: usize },

    #[error("Embedding lengths differ: {from} vs {to}")]
    EmbeddingLength { from: usize, to: usize },

    #[error("Comparator {comparator} cannot handle {content} content")]
    IncompatibleContent {
        comparator: String,
        content: String,
    },

    #[error("Embedding model failed: {0}")]
    Model(String),

    #[error("Failed to encode diff image: {0}")]
    Encode(String),
}

/// Errors that occur while writing reports
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Result for {pair_id} ({metric}) was already reported")]
    DuplicateRow { pair_id: String, metric: String },

    #[error("Failed to serialize report manifest: {0}")]
    Manifest(String),
}

/// Errors from external engines (rasterizer, OCR, embedding model).
///
/// These are fatal: without the engine no pair can be processed.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{tool} is not available ({reason}). Install it or set its path in the settings.")]
    Unavailable { tool: String, reason: String },

    #[error("OCR language data missing for: {}. Install the tesseract language packs.", missing.join(", "))]
    LanguageUnavailable { missing: Vec<String> },

    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),
}

/// Classification of per-pair failures, recorded in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DirectoryNotFound,
    ConversionError,
    RecognitionError,
    ParseError,
    DimensionMismatch,
    DegenerateEmbedding,
    PageCountMismatch,
    IncompatibleContent,
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::DirectoryNotFound => "DirectoryNotFound",
            ErrorKind::ConversionError => "ConversionError",
            ErrorKind::RecognitionError => "RecognitionError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::DimensionMismatch => "DimensionMismatch",
            ErrorKind::DegenerateEmbedding => "DegenerateEmbedding",
            ErrorKind::PageCountMismatch => "PageCountMismatch",
            ErrorKind::IncompatibleContent => "IncompatibleContent",
            ErrorKind::Io => "Io",
        };
        f.write_str(name)
    }
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::DirectoryNotFound { .. } => ErrorKind::DirectoryNotFound,
            ScanError::ReadDirectory { .. } => ErrorKind::Io,
        }
    }
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Conversion { .. } => ErrorKind::ConversionError,
            ExtractError::Recognition { .. } => ErrorKind::RecognitionError,
            ExtractError::Parse { .. } => ErrorKind::ParseError,
            ExtractError::Io { .. } => ErrorKind::Io,
        }
    }
}

impl CompareError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompareError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            CompareError::PageCountMismatch { .. } => ErrorKind::PageCountMismatch,
            CompareError::DegenerateEmbedding { .. } | CompareError::EmbeddingLength { .. } => {
                ErrorKind::DegenerateEmbedding
            }
            CompareError::IncompatibleContent { .. } => ErrorKind::IncompatibleContent,
            CompareError::Model(_) => ErrorKind::DegenerateEmbedding,
            CompareError::Encode(_) => ErrorKind::Io,
        }
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CompareToolError>;
