//! Cross-validation splitters

use crate::error::{MycsvError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Cross-validation strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// Contiguous, unshuffled folds
    KFold { n_splits: usize },
    /// Folds keeping each class's share, assigned in class order
    StratifiedKFold { n_splits: usize },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::KFold { n_splits: 5 }
    }
}

impl CVStrategy {
    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::KFold { n_splits } | CVStrategy::StratifiedKFold { n_splits } => *n_splits,
        }
    }
}

/// Number of folds actually used for `n_samples` rows: `requested`
/// clamped to the row count, never below 2
pub fn effective_splits(requested: usize, n_samples: usize) -> usize {
    requested.min(n_samples).max(2)
}

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
pub struct CrossValidator {
    strategy: CVStrategy,
}

impl CrossValidator {
    pub fn new(strategy: CVStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> CVStrategy {
        self.strategy
    }

    /// Generate train/test splits. Test indices of every fold are ascending.
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        let n_splits = self.strategy.n_splits();
        if n_splits < 2 {
            return Err(MycsvError::InvalidInput("n_splits must be at least 2".to_string()));
        }
        if n_samples < n_splits {
            return Err(MycsvError::InvalidInput(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let folds = match self.strategy {
            CVStrategy::KFold { .. } => k_fold_assignment(n_samples, n_splits),
            CVStrategy::StratifiedKFold { .. } => {
                let y = y.ok_or_else(|| {
                    MycsvError::InvalidInput("StratifiedKFold requires target array".to_string())
                })?;
                if y.len() != n_samples {
                    return Err(MycsvError::ShapeError {
                        expected: format!("y length = {}", n_samples),
                        actual: format!("y length = {}", y.len()),
                    });
                }
                stratified_assignment(y, n_splits)
            }
        };

        Ok(build_splits(&folds, n_splits))
    }
}

/// Fold of each row; the first `n % k` folds take one extra row
fn k_fold_assignment(n_samples: usize, n_splits: usize) -> Vec<usize> {
    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;
    let mut folds = Vec::with_capacity(n_samples);
    for fold_idx in 0..n_splits {
        let size = if fold_idx < remainder { base + 1 } else { base };
        folds.extend(std::iter::repeat(fold_idx).take(size));
    }
    folds
}

/// Round-robin over rows grouped by ascending class. The counter carries
/// across classes so no fold is left empty.
fn stratified_assignment(y: &Array1<f64>, n_splits: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..y.len()).collect();
    order.sort_by(|&a, &b| y[a].total_cmp(&y[b]).then(a.cmp(&b)));

    let mut folds = vec![0; y.len()];
    for (position, &row) in order.iter().enumerate() {
        folds[row] = position % n_splits;
    }
    folds
}

fn build_splits(folds: &[usize], n_splits: usize) -> Vec<CVSplit> {
    (0..n_splits)
        .map(|fold_idx| {
            let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                (0..folds.len()).partition(|&i| folds[i] == fold_idx);
            CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            }
        })
        .collect()
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    pub n_folds: usize,
}

impl CVResults {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: f64::NAN,
                std_score: f64::NAN,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}
