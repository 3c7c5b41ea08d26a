//! Bytes-in, bytes-out facade over the whole pipeline

use super::config::PipelineConfig;
use crate::cleaning::{CleaningReport, DataCleaner};
use crate::error::Result;
use crate::inference::{ArtifactAssembler, ArtifactMetadata, InferenceRunner, TrainedArtifact};
use crate::ingest::TableIngestor;
use crate::preprocessing::FeatureTransformer;
use crate::profiling::{ColumnProfile, ColumnProfiler, DatasetSummary, TaskInferencer, TaskSpec};
use crate::training::ModelSelector;
use crate::utils::frame::filter_rows;
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: TrainedArtifact,
    pub cleaning: CleaningReport,
    pub profile: ColumnProfile,
    pub task: TaskSpec,
    pub duration_secs: f64,
}

/// Runs ingestion, cleaning, training and inference with one configuration
#[derive(Debug, Clone, Default)]
pub struct AutoPipeline {
    config: PipelineConfig,
}

impl AutoPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn read(&self, bytes: &[u8]) -> Result<DataFrame> {
        TableIngestor::new(self.config.ingest.clone()).read_bytes(bytes)
    }

    /// Cleaned table as UTF-8 CSV with a header row
    pub fn clean_bytes(&self, bytes: &[u8]) -> Result<(Vec<u8>, CleaningReport)> {
        let df = self.read(bytes)?;
        let outcome = DataCleaner::new(self.config.cleaning.clone()).clean(df)?;
        let mut data = outcome.data;
        Ok((to_csv_bytes(&mut data)?, outcome.report))
    }

    pub fn train_bytes(&self, bytes: &[u8]) -> Result<TrainingOutcome> {
        let df = self.read(bytes)?;
        self.train_frame(df)
    }

    /// Clean, profile, infer the task, fit features and select a model
    pub fn train_frame(&self, df: DataFrame) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let cleaned = DataCleaner::new(self.config.cleaning.clone()).clean(df)?;
        let data = cleaned.data;

        let profile = ColumnProfiler::new().profile(&data)?;
        let task = TaskInferencer::new().infer(&data, self.config.target.as_deref())?;

        let target = task.target_vector(&data)?;
        let training_rows = if target.rows.len() == data.height() {
            data
        } else {
            let mut keep = vec![false; data.height()];
            for &row in &target.rows {
                keep[row] = true;
            }
            filter_rows(&data, &keep)?
        };

        let mut transformer = FeatureTransformer::new();
        let x = transformer.fit_transform(&training_rows, &profile, &task.target)?;

        let best = ModelSelector::new(self.config.selection.clone()).select(&x, &target.y, &task)?;
        let metadata = ArtifactMetadata::new(&best, &task, &transformer, x.nrows());
        let artifact = ArtifactAssembler::assemble(transformer, best, &task, metadata)?
            .with_cleaning(self.config.cleaning.clone());

        let duration_secs = start.elapsed().as_secs_f64();
        info!(
            family = %artifact.metadata.family,
            score = artifact.metadata.score,
            task = %task.kind,
            duration_secs,
            "Training complete"
        );

        Ok(TrainingOutcome {
            artifact,
            cleaning: cleaned.report,
            profile,
            task,
            duration_secs,
        })
    }

    /// Cleaned input plus a `Predictions` column, as CSV
    pub fn predict_bytes(&self, bytes: &[u8], artifact: &TrainedArtifact) -> Result<Vec<u8>> {
        let df = self.read(bytes)?;
        let mut predicted = InferenceRunner::new(artifact.clone()).run(df)?;
        to_csv_bytes(&mut predicted)
    }

    /// Statistics of the cleaned table
    pub fn summarize_bytes(&self, bytes: &[u8]) -> Result<DatasetSummary> {
        let df = self.read(bytes)?;
        let cleaned = DataCleaner::new(self.config.cleaning.clone()).clean(df)?;
        DatasetSummary::compute(&cleaned.data)
    }
}

pub fn to_csv_bytes(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf).include_header(true).finish(df)?;
    Ok(buf)
}
