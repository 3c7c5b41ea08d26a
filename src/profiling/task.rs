//! Task type inference from the target column

use crate::error::{MycsvError, Result};
use crate::preprocessing::{LabelEncoder, TargetScaler};
use crate::utils::frame::{column_f64, is_numeric_dtype};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Prediction task kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Classification,
    Regression,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Classification => f.write_str("classification"),
            TaskKind::Regression => f.write_str("regression"),
        }
    }
}

/// The inferred task: target, kind and the target-side transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub target: String,
    pub kind: TaskKind,
    pub target_scaler: Option<TargetScaler>,
    pub label_encoder: Option<LabelEncoder>,
}

/// Training target after encoding. `rows` indexes the table rows that
/// carry a usable target value.
#[derive(Debug, Clone)]
pub struct TargetVector {
    pub rows: Vec<usize>,
    pub y: Array1<f64>,
}

impl TaskSpec {
    pub fn is_classification(&self) -> bool {
        self.kind == TaskKind::Classification
    }

    pub fn n_classes(&self) -> Option<usize> {
        self.label_encoder.as_ref().map(LabelEncoder::n_classes)
    }

    /// Encode the target column: class indices for classification, scaled
    /// values for regression. Rows with a missing target are skipped.
    pub fn target_vector(&self, df: &DataFrame) -> Result<TargetVector> {
        let column = df
            .column(&self.target)
            .map_err(|_| MycsvError::SchemaMismatch(format!("target column '{}' not found", self.target)))?;

        let encoded: Vec<Option<f64>> = match (&self.label_encoder, &self.target_scaler) {
            (Some(encoder), _) => encoder
                .encode(column)?
                .into_iter()
                .map(|idx| idx.map(|i| i as f64))
                .collect(),
            (None, Some(scaler)) => column_f64(column)?
                .into_iter()
                .map(|v| v.map(|x| (x - scaler.mean()) / scaler.std()))
                .collect(),
            (None, None) => return Err(MycsvError::ModelNotFitted),
        };

        let (rows, values): (Vec<usize>, Vec<f64>) = encoded
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|x| (i, x)))
            .unzip();

        if rows.is_empty() {
            return Err(MycsvError::EmptyOrDegenerateTable(format!(
                "target column '{}' has no values",
                self.target
            )));
        }
        Ok(TargetVector {
            rows,
            y: Array1::from_vec(values),
        })
    }
}

/// Decides classification vs. regression
#[derive(Debug, Clone)]
pub struct TaskInferencer {
    /// numeric targets with at most this many distinct values are classes
    max_numeric_classes: usize,
}

impl Default for TaskInferencer {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskInferencer {
    pub fn new() -> Self {
        Self { max_numeric_classes: 5 }
    }

    pub fn with_max_numeric_classes(mut self, n: usize) -> Self {
        self.max_numeric_classes = n;
        self
    }

    /// Infer the task. The target defaults to the last column.
    pub fn infer(&self, df: &DataFrame, target: Option<&str>) -> Result<TaskSpec> {
        let target = match target {
            Some(name) => name.to_string(),
            None => df
                .get_column_names()
                .last()
                .map(|n| n.to_string())
                .ok_or_else(|| MycsvError::EmptyOrDegenerateTable("table has no columns".to_string()))?,
        };
        let column = df
            .column(&target)
            .map_err(|_| MycsvError::SchemaMismatch(format!("target column '{}' not found", target)))?;

        let spec = if !is_numeric_dtype(column.dtype()) {
            TaskSpec {
                kind: TaskKind::Classification,
                label_encoder: Some(LabelEncoder::fit(column)?),
                target_scaler: None,
                target,
            }
        } else {
            let values: Vec<f64> = column_f64(column)?.into_iter().flatten().collect();
            let distinct: HashSet<u64> = values.iter().map(|v| v.to_bits()).collect();
            if distinct.is_empty() {
                return Err(MycsvError::EmptyOrDegenerateTable(format!(
                    "target column '{}' has no values",
                    target
                )));
            }

            if distinct.len() <= self.max_numeric_classes {
                TaskSpec {
                    kind: TaskKind::Classification,
                    label_encoder: Some(LabelEncoder::fit(column)?),
                    target_scaler: None,
                    target,
                }
            } else {
                TaskSpec {
                    kind: TaskKind::Regression,
                    label_encoder: None,
                    target_scaler: Some(TargetScaler::fit(&Array1::from_vec(values))),
                    target,
                }
            }
        };

        info!(
            target = %spec.target,
            task = %spec.kind,
            classes = ?spec.n_classes(),
            "Inferred task"
        );
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_text_target_is_classification() {
        let df = df!("x" => &[1.0, 2.0, 3.0], "y" => &["yes", "no", "yes"]).unwrap();
        let spec = TaskInferencer::new().infer(&df, None).unwrap();
        assert_eq!(spec.target, "y");
        assert_eq!(spec.kind, TaskKind::Classification);
        assert_eq!(spec.n_classes(), Some(2));

        let target = spec.target_vector(&df).unwrap();
        assert_eq!(target.y.to_vec(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_many_distinct_floats_is_regression() {
        let values: Vec<f64> = (0..1000).map(|i| i as f64 * 0.37).collect();
        let df = df!("y" => &values, "x" => &values).unwrap();
        let spec = TaskInferencer::new().infer(&df, Some("y")).unwrap();
        assert_eq!(spec.kind, TaskKind::Regression);
        assert!(spec.target_scaler.is_some());
        assert!(spec.label_encoder.is_none());

        let target = spec.target_vector(&df).unwrap();
        assert_eq!(target.rows.len(), 1000);
        assert_relative_eq!(target.y.sum(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_few_integers_is_classification() {
        let df = df!("x" => &[0.1, 0.2, 0.3, 0.4], "y" => &[1, 2, 3, 1]).unwrap();
        let spec = TaskInferencer::new().infer(&df, None).unwrap();
        assert_eq!(spec.kind, TaskKind::Classification);
        assert_eq!(spec.n_classes(), Some(3));
    }

    #[test]
    fn test_unknown_target() {
        let df = df!("x" => &[1, 2]).unwrap();
        let err = TaskInferencer::new().infer(&df, Some("nope")).unwrap_err();
        assert_eq!(err.reason_code(), "schema_mismatch");
    }

    #[test]
    fn test_missing_target_rows_skipped() {
        let df = DataFrame::new(vec![
            Column::new("x".into(), &[1.0, 2.0, 3.0]),
            Column::new("y".into(), &[Some("a"), None, Some("b")]),
        ])
        .unwrap();
        let spec = TaskInferencer::new().infer(&df, None).unwrap();
        let target = spec.target_vector(&df).unwrap();
        assert_eq!(target.rows, vec![0, 2]);
        assert_eq!(target.y.to_vec(), vec![0.0, 1.0]);
    }
}
