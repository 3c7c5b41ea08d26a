//! Model selection across the family roster

use super::config::SelectionConfig;
use super::cross_validation::{effective_splits, CVSplit, CVStrategy, CrossValidator};
use super::grid_search::{GridSearch, ParamGrid};
use super::metrics::normalized_rmse_score;
use super::models::{BestCandidate, CandidateResult, FamilyScore, Model, ModelFamily, SkippedFamily};
use crate::error::{MycsvError, Result};
use crate::profiling::{TaskKind, TaskSpec};
use ndarray::{Array1, Array2};
use std::time::Instant;
use tracing::{info, warn};

/// Grid-searches every applicable family and keeps the best one
pub struct ModelSelector {
    config: SelectionConfig,
}

impl ModelSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// `y` holds class indices for classification and rescaled values for
    /// regression, as produced by [`TaskSpec::target_vector`].
    pub fn select(&self, x: &Array2<f64>, y: &Array1<f64>, task: &TaskSpec) -> Result<BestCandidate> {
        if x.nrows() != y.len() {
            return Err(MycsvError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() < 2 {
            return Err(MycsvError::EmptyOrDegenerateTable(format!(
                "model selection needs at least 2 rows, got {}",
                x.nrows()
            )));
        }

        let start = Instant::now();
        let n_splits = effective_splits(self.config.cv_folds, x.nrows());
        let strategy = match task.kind {
            TaskKind::Classification => CVStrategy::StratifiedKFold { n_splits },
            TaskKind::Regression => CVStrategy::KFold { n_splits },
        };
        let splits = CrossValidator::new(strategy).split(x.nrows(), Some(y))?;

        info!(
            task = %task.kind,
            rows = x.nrows(),
            features = x.ncols(),
            folds = n_splits,
            "Starting model selection"
        );

        let families: Vec<ModelFamily> = self
            .config
            .enabled_families()
            .into_iter()
            .filter(|f| f.supports(task.kind))
            .collect();

        let mut candidates: Vec<CandidateResult> = Vec::with_capacity(families.len());
        let mut skipped: Vec<SkippedFamily> = Vec::new();
        for family in families {
            if family == ModelFamily::Svm && x.nrows() > self.config.max_svm_rows {
                let reason = format!("{} rows exceed max_svm_rows = {}", x.nrows(), self.config.max_svm_rows);
                warn!(family = %family, reason = %reason, "Skipping model family");
                skipped.push(SkippedFamily { family, reason });
                continue;
            }
            match self.evaluate_family(family, x, y, task, &splits) {
                Ok(candidate) => {
                    info!(family = %family, score = candidate.score, params = %candidate.params, "Family evaluated");
                    candidates.push(candidate);
                }
                Err(e) => {
                    warn!(family = %family, error = %e, "Skipping model family");
                    skipped.push(SkippedFamily {
                        family,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let leaderboard: Vec<FamilyScore> = candidates
            .iter()
            .map(|c| FamilyScore {
                family: c.family,
                params: c.params.clone(),
                score: c.score,
            })
            .collect();

        let mut best: Option<CandidateResult> = None;
        for candidate in candidates {
            let is_better = best.as_ref().map_or(true, |b| candidate.score > b.score);
            if is_better {
                best = Some(candidate);
            }
        }

        let best = best.ok_or_else(|| {
            MycsvError::NoApplicableModelFamily(format!("no model family could be trained for {}", task.kind))
        })?;

        info!(
            family = %best.family,
            score = best.score,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Model selection complete"
        );

        Ok(BestCandidate {
            family: best.family,
            estimator: best.estimator,
            params: best.params,
            score: best.score,
            leaderboard,
            skipped,
        })
    }

    fn evaluate_family(
        &self,
        family: ModelFamily,
        x: &Array2<f64>,
        y: &Array1<f64>,
        task: &TaskSpec,
        splits: &[CVSplit],
    ) -> Result<CandidateResult> {
        let grid = ParamGrid::for_family(family, task.kind);
        let outcome = GridSearch::new(family, task.kind, &self.config).run(&grid, x, y, splits)?;
        let best = outcome.best();

        let score = match task.kind {
            TaskKind::Classification => best.cv.mean_score,
            TaskKind::Regression => match &task.target_scaler {
                Some(scaler) => normalized_rmse_score(
                    &scaler.inverse_transform(y),
                    &scaler.inverse_transform(&best.oof_predictions),
                ),
                None => normalized_rmse_score(y, &best.oof_predictions),
            },
        };

        let mut estimator = family.build(task.kind, &best.params, &self.config)?;
        estimator.fit(x, y)?;

        Ok(CandidateResult {
            family,
            estimator,
            params: best.params.clone(),
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::TargetScaler;
    use ndarray::array;

    fn classification_task() -> TaskSpec {
        TaskSpec {
            target: "label".to_string(),
            kind: TaskKind::Classification,
            target_scaler: None,
            label_encoder: None,
        }
    }

    #[test]
    fn test_select_separable_classes() {
        let x = array![[0.0, 0.1], [0.2, 0.0], [0.1, 0.3], [0.3, 0.2], [5.0, 5.1], [5.2, 5.0], [5.1, 5.3], [5.3, 5.2]];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let config = SelectionConfig::new().with_families(vec![
            ModelFamily::DecisionTree,
            ModelFamily::KNearestNeighbors,
        ]);

        let best = ModelSelector::new(config).select(&x, &y, &classification_task()).unwrap();
        // both families are perfect; roster order breaks the tie
        assert_eq!(best.family, ModelFamily::DecisionTree);
        assert_eq!(best.score, 1.0);
        assert_eq!(best.leaderboard.len(), 2);
        assert_eq!(best.estimator.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_svm_row_limit_reports_skip() {
        let x = array![[0.0, 0.1], [0.2, 0.0], [0.1, 0.3], [0.3, 0.2], [5.0, 5.1], [5.2, 5.0], [5.1, 5.3], [5.3, 5.2]];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let config = SelectionConfig::new()
            .with_families(vec![ModelFamily::DecisionTree, ModelFamily::Svm])
            .with_max_svm_rows(4);

        let best = ModelSelector::new(config).select(&x, &y, &classification_task()).unwrap();
        assert_eq!(best.leaderboard.len(), 1);
        assert_eq!(best.skipped.len(), 1);
        assert_eq!(best.skipped[0].family, ModelFamily::Svm);
        assert!(best.skipped[0].reason.contains("max_svm_rows"));

        let config = SelectionConfig::new().with_families(vec![ModelFamily::Svm]).with_max_svm_rows(8);
        let best = ModelSelector::new(config).select(&x, &y, &classification_task()).unwrap();
        assert_eq!(best.family, ModelFamily::Svm);
        assert!(best.skipped.is_empty());
    }

    #[test]
    fn test_regression_score_in_unit_interval() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f64);
        let y_real = Array1::from_shape_fn(20, |i| 3.0 * i as f64 + 1.0);
        let scaler = TargetScaler::fit(&y_real);
        let y = scaler.transform(&y_real);
        let task = TaskSpec {
            target: "y".to_string(),
            kind: TaskKind::Regression,
            target_scaler: Some(scaler),
            label_encoder: None,
        };

        let config = SelectionConfig::new().with_families(vec![ModelFamily::LinearRegression]);
        let best = ModelSelector::new(config).select(&x, &y, &task).unwrap();
        assert_eq!(best.family, ModelFamily::LinearRegression);
        assert!(best.score > 0.99 && best.score <= 1.0, "score {}", best.score);
    }

    #[test]
    fn test_no_applicable_family() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];
        let config = SelectionConfig::new().with_families(vec![ModelFamily::LinearRegression]);
        let err = ModelSelector::new(config)
            .select(&x, &y, &classification_task())
            .unwrap_err();
        assert_eq!(err.reason_code(), "no_applicable_model_family");
    }

    #[test]
    fn test_too_few_rows() {
        let x = array![[0.0]];
        let y = array![0.0];
        let err = ModelSelector::new(SelectionConfig::default())
            .select(&x, &y, &classification_task())
            .unwrap_err();
        assert!(matches!(err, MycsvError::EmptyOrDegenerateTable(_)));
    }
}
