//! Scoring functions used by model selection

use crate::profiling::TaskKind;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Fraction of exactly matching labels
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mse = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>()
        / y_true.len() as f64;
    mse.sqrt()
}

/// Population standard deviation
pub fn population_std(y: &Array1<f64>) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let n = y.len() as f64;
    let mean = y.sum() / n;
    (y.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt()
}

/// `max(0, 1 - rmse/std)` on the real target scale. A constant target
/// scores 1 when predicted exactly and 0 otherwise.
pub fn normalized_rmse_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let error = rmse(y_true, y_pred);
    let spread = population_std(y_true);
    if spread > 0.0 {
        (1.0 - error / spread).max(0.0)
    } else if error == 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Per-fold objective maximized by grid search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scoring {
    Accuracy,
    NegRmse,
}

impl Scoring {
    pub fn for_task(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Classification => Scoring::Accuracy,
            TaskKind::Regression => Scoring::NegRmse,
        }
    }

    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        match self {
            Scoring::Accuracy => accuracy(y_true, y_pred),
            Scoring::NegRmse => -rmse(y_true, y_pred),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        assert_relative_eq!(accuracy(&array![0.0, 1.0, 2.0, 1.0], &array![0.0, 1.0, 1.0, 1.0]), 0.75);
    }

    #[test]
    fn test_normalized_rmse_score() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(normalized_rmse_score(&y, &y), 1.0);

        // predicting the mean scores zero
        let mean = array![2.5, 2.5, 2.5, 2.5];
        assert_relative_eq!(normalized_rmse_score(&y, &mean), 0.0, epsilon = 1e-12);

        let far = array![10.0, 10.0, 10.0, 10.0];
        assert_eq!(normalized_rmse_score(&y, &far), 0.0);
    }

    #[test]
    fn test_scoring_sign() {
        let y = array![0.0, 0.0];
        let p = array![1.0, 1.0];
        assert_relative_eq!(Scoring::NegRmse.score(&y, &p), -1.0);
        assert_eq!(Scoring::for_task(TaskKind::Classification), Scoring::Accuracy);
    }
}
