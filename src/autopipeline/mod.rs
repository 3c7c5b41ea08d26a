//! End-to-end pipeline facade
//!
//! [`AutoPipeline`] wires ingestion, cleaning, profiling, model selection
//! and inference together over raw bytes. The CLI is a thin layer on top.

mod config;
mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::{to_csv_bytes, AutoPipeline, TrainingOutcome};
