//! Exhaustive grid search with cross-validation

use super::config::SelectionConfig;
use super::cross_validation::{CVResults, CVSplit};
use super::metrics::Scoring;
use super::models::{HyperParams, Model, ModelFamily, ParamValue};
use crate::error::{MycsvError, Result};
use crate::profiling::TaskKind;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

/// Cartesian product of named parameter axes
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new(axes: Vec<(String, Vec<ParamValue>)>) -> Self {
        let mut axes = axes;
        axes.sort_by(|a, b| a.0.cmp(&b.0));
        Self { axes }
    }

    pub fn for_family(family: ModelFamily, kind: TaskKind) -> Self {
        Self::new(family.param_axes(kind))
    }

    /// All grid points. Axes are ordered by name and the last axis varies
    /// fastest. An empty grid has a single point with no parameters.
    pub fn points(&self) -> Vec<HyperParams> {
        let mut points = vec![HyperParams::new()];
        for (name, values) in &self.axes {
            points = points
                .into_iter()
                .flat_map(|point| {
                    values
                        .iter()
                        .map(move |value| point.clone().with(name, value.clone()))
                        .collect::<Vec<_>>()
                })
                .collect();
        }
        points
    }

    pub fn len(&self) -> usize {
        self.axes.iter().map(|(_, v)| v.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evaluation of one grid point
#[derive(Debug, Clone)]
pub struct GridPointResult {
    pub params: HyperParams,
    pub cv: CVResults,
    /// Out-of-fold predictions, one per row
    pub oof_predictions: Array1<f64>,
}

/// All evaluated points plus the index of the best one
#[derive(Debug, Clone)]
pub struct GridSearchOutcome {
    pub results: Vec<GridPointResult>,
    pub best_idx: usize,
    pub duration_secs: f64,
}

impl GridSearchOutcome {
    pub fn best(&self) -> &GridPointResult {
        &self.results[self.best_idx]
    }
}

/// Grid search over one model family
pub struct GridSearch {
    family: ModelFamily,
    kind: TaskKind,
    scoring: Scoring,
    settings: SelectionConfig,
}

impl GridSearch {
    pub fn new(family: ModelFamily, kind: TaskKind, settings: &SelectionConfig) -> Self {
        Self {
            family,
            kind,
            scoring: Scoring::for_task(kind),
            settings: settings.clone(),
        }
    }

    /// Every (point, fold) pair is fit in parallel. Results are gathered in
    /// index order, and the first point with the highest mean fold score
    /// wins. Points with a failing fold are discarded; if none survive the
    /// first failure is returned.
    pub fn run(
        &self,
        grid: &ParamGrid,
        x: &Array2<f64>,
        y: &Array1<f64>,
        splits: &[CVSplit],
    ) -> Result<GridSearchOutcome> {
        let start = Instant::now();
        let points = grid.points();
        let n_folds = splits.len();
        if n_folds == 0 {
            return Err(MycsvError::InvalidInput("grid search needs at least one fold".to_string()));
        }

        let fold_predictions: Vec<Result<Array1<f64>>> = (0..points.len() * n_folds)
            .into_par_iter()
            .map(|job| self.fit_fold(&points[job / n_folds], x, y, &splits[job % n_folds]))
            .collect();

        let mut results = Vec::with_capacity(points.len());
        let mut first_error = None;
        let mut best: Option<(usize, f64)> = None;

        for (point_idx, params) in points.into_iter().enumerate() {
            let folds = &fold_predictions[point_idx * n_folds..(point_idx + 1) * n_folds];
            let mut oof = Array1::zeros(y.len());
            let mut scores = Vec::with_capacity(n_folds);
            let mut failed = false;

            for (split, predictions) in splits.iter().zip(folds) {
                match predictions {
                    Ok(pred) => {
                        let y_test = y.select(Axis(0), &split.test_indices);
                        scores.push(self.scoring.score(&y_test, pred));
                        for (&row, &p) in split.test_indices.iter().zip(pred.iter()) {
                            oof[row] = p;
                        }
                    }
                    Err(e) => {
                        debug!(family = %self.family, params = %params, error = %e, "grid point failed");
                        if first_error.is_none() {
                            first_error = Some(MycsvError::TrainingError(e.to_string()));
                        }
                        failed = true;
                        break;
                    }
                }
            }
            if failed {
                continue;
            }

            let cv = CVResults::from_scores(scores);
            let is_better = match best {
                None => true,
                Some((_, best_score)) => cv.mean_score > best_score,
            };
            if is_better {
                best = Some((results.len(), cv.mean_score));
            }
            results.push(GridPointResult {
                params,
                cv,
                oof_predictions: oof,
            });
        }

        let best_idx = match best {
            Some((idx, _)) => idx,
            None => {
                return Err(first_error.unwrap_or_else(|| {
                    MycsvError::TrainingError(format!("no grid point of {} could be fit", self.family))
                }))
            }
        };

        Ok(GridSearchOutcome {
            results,
            best_idx,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    fn fit_fold(&self, params: &HyperParams, x: &Array2<f64>, y: &Array1<f64>, split: &CVSplit) -> Result<Array1<f64>> {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);

        let mut estimator = self.family.build(self.kind, params, &self.settings)?;
        estimator.fit(&x_train, &y_train)?;
        estimator.predict(&x_test)
    }
}
