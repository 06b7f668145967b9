//! # Pipeline Module
//!
//! Orchestrates a full comparison run.
//!
//! ## Pipeline Stages
//! 1. **Pair** - Match documents by name across the two directories
//! 2. **Acquire** - Check the rasterizer, start OCR, load the embedding model
//! 3. **Compare** - Extract and score every pair on a bounded worker pool
//! 4. **Report** - Stream outcomes into a single report writer, then close it
//!
//! ## Parallelism
//! A dedicated rayon pool sized by `workers` processes pairs; within a
//! pair both documents are extracted concurrently with `rayon::join`.
//! Results travel over a bounded crossbeam channel to the one thread that
//! owns the report, so report files never see concurrent writes.

mod executor;
mod resources;

pub use executor::{default_workers, Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
pub use resources::{EngineOverrides, SharedResources};
