//! # PDF Pair Compare
//!
//! Compares PDF documents that share a file name across two directories
//! and explains how each pair differs.
//!
//! ## Core Philosophy
//! - **One bad pair never stops a run** - failures are recorded, not fatal
//! - **Pluggable strategies** - extraction and scoring are chosen by configuration
//! - **Reviewable output** - CSV rows, patches, highlight masks and HTML pages
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Pairing, extraction, comparison, reporting and orchestration
//! - `config` - Settings file and command-line overrides
//! - `events` - Event-driven progress reporting
//! - `error` - Error types and per-pair failure kinds
//! - `cli` - Command-line interface (binary only)

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{CompareToolError, Result};

/// Initialize tracing for the library
///
/// Honors `RUST_LOG`; without it the level is `warn`, or `debug` when
/// `verbose` is set. This should be called once by the application entry
/// point. Later calls are ignored.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
