//! Self-contained trained artifact and its JSON persistence

use crate::cleaning::CleaningConfig;
use crate::error::{MycsvError, Result};
use crate::preprocessing::{FeatureTransformer, LabelEncoder, TargetScaler};
use crate::profiling::{TaskKind, TaskSpec};
use crate::training::{BestCandidate, Estimator, FamilyScore, HyperParams, ModelFamily, SkippedFamily};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Descriptive data stored alongside the fitted objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub family: ModelFamily,
    pub family_name: String,
    pub score: f64,
    pub params: HyperParams,
    pub target: String,
    pub task: TaskKind,
    pub feature_columns: Vec<String>,
    pub n_training_rows: usize,
    pub leaderboard: Vec<FamilyScore>,
    /// Families left out of selection with the reason
    #[serde(default)]
    pub skipped: Vec<SkippedFamily>,
    pub created_at: DateTime<Utc>,
    pub version: String,
}

impl ArtifactMetadata {
    pub fn new(
        best: &BestCandidate,
        task: &TaskSpec,
        transformer: &FeatureTransformer,
        n_training_rows: usize,
    ) -> Self {
        Self {
            family: best.family,
            family_name: best.family.name().to_string(),
            score: best.score,
            params: best.params.clone(),
            target: task.target.clone(),
            task: task.kind,
            feature_columns: transformer.input_columns().into_iter().map(String::from).collect(),
            n_training_rows,
            leaderboard: best.leaderboard.clone(),
            skipped: best.skipped.clone(),
            created_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Everything needed to replay cleaning, transformation and prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub transformer: FeatureTransformer,
    pub estimator: Estimator,
    pub target_scaler: Option<TargetScaler>,
    pub label_encoder: Option<LabelEncoder>,
    pub task: TaskKind,
    /// Cleaning policy replayed on inference input
    pub cleaning: CleaningConfig,
    pub metadata: ArtifactMetadata,
}

impl TrainedArtifact {
    pub fn with_cleaning(mut self, cleaning: CleaningConfig) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|e| {
            MycsvError::SerializationFailure(format!("cannot write {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), family = %self.metadata.family, "Artifact saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            MycsvError::SerializationFailure(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }
}

/// Bundles the fitted pieces of a training run
pub struct ArtifactAssembler;

impl ArtifactAssembler {
    /// The transformer must be fitted and the task's decoder must match its
    /// kind: a label encoder for classification, a rescaler for regression.
    pub fn assemble(
        transformer: FeatureTransformer,
        best: BestCandidate,
        task: &TaskSpec,
        metadata: ArtifactMetadata,
    ) -> Result<TrainedArtifact> {
        if !transformer.is_fitted() {
            return Err(MycsvError::ModelNotFitted);
        }
        match task.kind {
            TaskKind::Classification if task.label_encoder.is_none() => {
                return Err(MycsvError::InvalidInput(
                    "classification artifact needs a label encoder".to_string(),
                ))
            }
            TaskKind::Regression if task.target_scaler.is_none() => {
                return Err(MycsvError::InvalidInput(
                    "regression artifact needs a target rescaler".to_string(),
                ))
            }
            _ => {}
        }

        Ok(TrainedArtifact {
            transformer,
            estimator: best.estimator,
            target_scaler: task.target_scaler.clone(),
            label_encoder: task.label_encoder.clone(),
            task: task.kind,
            cleaning: CleaningConfig::default(),
            metadata,
        })
    }
}
