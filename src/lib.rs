//! mycsv-automl - CSV cleaning and automated model selection
//!
//! This crate turns an arbitrary delimited file of unknown encoding into a
//! cleaned table and a reusable trained artifact:
//! - Encoding detection and tolerant CSV ingestion
//! - A fixed-order cleaning pipeline (dedup, dates, pruning, imputation)
//! - Column roles, task inference and dataset summaries
//! - Feature transformation and multi-family grid search
//! - Self-contained artifacts replayed on new data
//!
//! # Modules
//!
//! ## Data
//! - [`ingest`] - Encoding detection and parsing
//! - [`cleaning`] - Deduplication, date normalization, pruning, imputation
//! - [`profiling`] - Column roles, task inference, summaries
//!
//! ## Modelling
//! - [`preprocessing`] - Scaling and encoding into a feature matrix
//! - [`training`] - Estimators, cross-validation and model selection
//! - [`inference`] - Trained artifacts and prediction
//!
//! ## Services
//! - [`autopipeline`] - Bytes-to-bytes facade
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data
pub mod ingest;
pub mod cleaning;
pub mod profiling;

// Modelling
pub mod preprocessing;
pub mod training;
pub mod inference;

// Services
pub mod autopipeline;
pub mod cli;

// Utilities
pub mod utils;

pub use error::{MycsvError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{MycsvError, Result};

    // Ingestion and cleaning
    pub use crate::ingest::{Detection, EncodingDetector, IngestConfig, TableIngestor};
    pub use crate::cleaning::{CleaningConfig, CleaningOutcome, CleaningReport, DataCleaner};

    // Profiling
    pub use crate::profiling::{ColumnProfile, ColumnProfiler, ColumnRole, DatasetSummary, TaskInferencer, TaskKind, TaskSpec};

    // Preprocessing
    pub use crate::preprocessing::{FeatureTransformer, LabelEncoder, TargetScaler};

    // Training
    pub use crate::training::{BestCandidate, Estimator, HyperParams, Model, ModelFamily, ModelSelector, SelectionConfig};

    // Inference
    pub use crate::inference::{ArtifactAssembler, ArtifactMetadata, InferenceRunner, TrainedArtifact};

    // Auto pipeline
    pub use crate::autopipeline::{AutoPipeline, PipelineConfig, TrainingOutcome};
}
