//! Trained artifacts and inference
//!
//! A [`TrainedArtifact`] bundles the fitted feature transformer, the best
//! estimator and the target decoder. [`InferenceRunner`] replays cleaning
//! and transformation on new data and appends a `Predictions` column.

mod artifact;
mod engine;

pub use artifact::{ArtifactAssembler, ArtifactMetadata, TrainedArtifact};
pub use engine::{InferenceRunner, PREDICTIONS_COLUMN};
