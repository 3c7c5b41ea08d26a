//! Replays a trained pipeline on new data

use super::artifact::TrainedArtifact;
use crate::cleaning::DataCleaner;
use crate::error::Result;
use crate::profiling::TaskKind;
use crate::training::Model;
use ndarray::Array1;
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Name of the column holding predictions in the output table
pub const PREDICTIONS_COLUMN: &str = "Predictions";

/// Runs clean → transform → predict → decode with a loaded artifact
#[derive(Debug, Clone)]
pub struct InferenceRunner {
    artifact: TrainedArtifact,
}

impl InferenceRunner {
    pub fn new(artifact: TrainedArtifact) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &TrainedArtifact {
        &self.artifact
    }

    /// Cleaned input with a `Predictions` column appended, or replaced when
    /// the input already has one.
    pub fn run(&self, df: DataFrame) -> Result<DataFrame> {
        let start = Instant::now();
        let mut cleaned = DataCleaner::new(self.artifact.cleaning.clone()).clean(df)?.data;

        let x = self.artifact.transformer.transform(&cleaned)?;
        debug!(rows = x.nrows(), features = x.ncols(), "Inference features built");

        let raw = if x.nrows() == 0 {
            Array1::zeros(0)
        } else {
            self.artifact.estimator.predict(&x)?
        };
        let predictions = self.decode(raw)?;
        cleaned.with_column(predictions)?;

        info!(
            rows = cleaned.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Inference complete"
        );
        Ok(cleaned)
    }

    fn decode(&self, raw: Array1<f64>) -> Result<Series> {
        match self.artifact.task {
            TaskKind::Regression => {
                let values = match &self.artifact.target_scaler {
                    Some(scaler) => scaler.inverse_transform(&raw),
                    None => raw,
                };
                Ok(Series::new(PREDICTIONS_COLUMN.into(), values.to_vec()))
            }
            TaskKind::Classification => match &self.artifact.label_encoder {
                Some(encoder) => encoder.decode(PREDICTIONS_COLUMN, &raw),
                None => Ok(Series::new(PREDICTIONS_COLUMN.into(), raw.to_vec())),
            },
        }
    }
}
