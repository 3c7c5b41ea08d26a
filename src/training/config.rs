//! Model selection configuration

use super::models::ModelFamily;
use super::svm::MAX_KERNEL_MATRIX_SAMPLES;
use serde::{Deserialize, Serialize};

/// Settings for the grid search over model families
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Requested folds; clamped to the row count and never below 2
    pub cv_folds: usize,
    /// Seed for every estimator's randomness
    pub random_state: u64,
    /// Restrict the roster to these families (roster order is kept)
    pub families: Option<Vec<ModelFamily>>,
    /// SVM is skipped above this many rows; its kernel matrix is dense
    pub max_svm_rows: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            random_state: 42,
            families: None,
            max_svm_rows: MAX_KERNEL_MATRIX_SAMPLES,
        }
    }
}

impl SelectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_families(mut self, families: Vec<ModelFamily>) -> Self {
        self.families = Some(families);
        self
    }

    pub fn with_max_svm_rows(mut self, rows: usize) -> Self {
        self.max_svm_rows = rows;
        self
    }

    /// Roster entries enabled by this config, in roster order
    pub fn enabled_families(&self) -> Vec<ModelFamily> {
        ModelFamily::ROSTER
            .iter()
            .copied()
            .filter(|f| self.families.as_ref().map_or(true, |allowed| allowed.contains(f)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SelectionConfig::default();
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.enabled_families().len(), 6);
        assert_eq!(config.max_svm_rows, 5_000);
    }

    #[test]
    fn test_family_filter_keeps_roster_order() {
        let config = SelectionConfig::new()
            .with_families(vec![ModelFamily::KNearestNeighbors, ModelFamily::LogisticRegression]);
        assert_eq!(
            config.enabled_families(),
            vec![ModelFamily::LogisticRegression, ModelFamily::KNearestNeighbors]
        );
    }
}
