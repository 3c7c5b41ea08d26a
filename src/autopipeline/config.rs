//! Aggregated pipeline configuration

use crate::cleaning::CleaningConfig;
use crate::error::{MycsvError, Result};
use crate::ingest::IngestConfig;
use crate::training::SelectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for every stage of the bytes-to-artifact pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ingest: IngestConfig,
    pub cleaning: CleaningConfig,
    pub selection: SelectionConfig,
    /// Target column; the last column when unset
    pub target: Option<String>,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ingest(mut self, ingest: IngestConfig) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn with_cleaning(mut self, cleaning: CleaningConfig) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Missing sections fall back to their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| MycsvError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"target": "label", "selection": {"cv_folds": 3, "random_state": 7, "families": null}}"#)
                .unwrap();
        assert_eq!(config.target.as_deref(), Some("label"));
        assert_eq!(config.selection.cv_folds, 3);
        assert_eq!(config.selection.max_svm_rows, 5_000);
        assert_eq!(config.cleaning.max_missing_fraction, 0.4);
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let config = PipelineConfig::new()
            .with_target("y")
            .with_cleaning(CleaningConfig::new().with_preserve_first_row_gaps(true));
        config.to_json_file(&path).unwrap();

        let loaded = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.target.as_deref(), Some("y"));
        assert!(loaded.cleaning.preserve_first_row_gaps);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = PipelineConfig::from_json_file(&path).unwrap_err();
        assert_eq!(err.reason_code(), "config_error");
    }
}
