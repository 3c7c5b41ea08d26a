//! Feature transformer: turns a profiled table into a numeric matrix
//!
//! Numeric and datetime columns are standardized, discrete columns are
//! expanded into indicator features. The transformer is fit once at training
//! time and replayed unchanged at inference time.

use super::encoder::OneHotEncoder;
use super::scaler::Scaler;
use crate::cleaning::dates::{epoch_days, parse_date};
use crate::error::{MycsvError, Result};
use crate::profiling::{ColumnProfile, ColumnRole};
use crate::utils::frame::{column_f64, column_strings};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// An input column and the role it was fitted with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub role: ColumnRole,
}

/// Fitted numeric feature space
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureTransformer {
    features: Vec<FeatureSpec>,
    scaler: Scaler,
    encoder: OneHotEncoder,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl FeatureTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit on every profiled column except `target`. Unsupported columns
    /// are left out of the feature space.
    pub fn fit(&mut self, df: &DataFrame, profile: &ColumnProfile, target: &str) -> Result<&mut Self> {
        self.features = profile
            .columns
            .iter()
            .filter(|c| c.name != target && c.role != ColumnRole::Unsupported)
            .map(|c| FeatureSpec {
                name: c.name.clone(),
                role: c.role,
            })
            .collect();
        if self.features.is_empty() {
            return Err(MycsvError::EmptyOrDegenerateTable(
                "no usable feature columns besides the target".to_string(),
            ));
        }

        let prepared = self.prepare(df)?;
        let continuous: Vec<String> = self
            .features
            .iter()
            .filter(|f| !f.role.is_discrete())
            .map(|f| f.name.clone())
            .collect();
        let discrete: Vec<String> = self
            .features
            .iter()
            .filter(|f| f.role.is_discrete())
            .map(|f| f.name.clone())
            .collect();

        self.scaler = Scaler::new();
        self.scaler.fit(&prepared, &continuous)?;
        self.encoder = OneHotEncoder::new();
        self.encoder.fit(&prepared, &discrete)?;

        self.feature_names = unique_names(
            self.features
                .iter()
                .flat_map(|f| {
                    if f.role.is_discrete() {
                        self.encoder.feature_names(&f.name)
                    } else {
                        vec![f.name.clone()]
                    }
                })
                .collect(),
        );
        self.is_fitted = true;

        debug!(
            inputs = self.features.len(),
            outputs = self.feature_names.len(),
            "Fitted feature transformer"
        );
        Ok(self)
    }

    /// Build the feature matrix. Never refits; a missing input column is a
    /// `SchemaMismatch`.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(MycsvError::ModelNotFitted);
        }

        // Prepared columns follow `features` order; outputs are built by position.
        let prepared = self.prepare(df)?;
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.feature_names.len());
        for (spec, col) in self.features.iter().zip(prepared.get_columns()) {
            if spec.role.is_discrete() {
                columns.extend(self.encoder.indicators(col)?);
            } else {
                columns.push(self.scaler.scale(col)?);
            }
        }
        if columns.len() != self.feature_names.len() {
            return Err(MycsvError::ShapeError {
                expected: format!("{} features", self.feature_names.len()),
                actual: format!("{} features", columns.len()),
            });
        }

        let n_rows = df.height();
        Ok(Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| columns[c][r]))
    }

    pub fn fit_transform(&mut self, df: &DataFrame, profile: &ColumnProfile, target: &str) -> Result<Array2<f64>> {
        self.fit(df, profile, target)?;
        self.transform(df)
    }

    /// Input columns the transformer expects, in fitted order
    pub fn input_columns(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Output feature names, one per matrix column
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Check the schema and coerce each input column to the representation
    /// its role calls for.
    fn prepare(&self, df: &DataFrame) -> Result<DataFrame> {
        let missing: Vec<&str> = self
            .features
            .iter()
            .filter(|f| df.column(&f.name).is_err())
            .map(|f| f.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(MycsvError::SchemaMismatch(format!(
                "missing columns: {}",
                missing.join(", ")
            )));
        }

        let columns = self
            .features
            .iter()
            .map(|f| {
                let col = df.column(&f.name)?;
                let name: PlSmallStr = f.name.as_str().into();
                let prepared = match f.role {
                    ColumnRole::Numeric => Column::new(name, column_f64(col)?),
                    ColumnRole::Datetime => {
                        let days: Vec<Option<f64>> = column_strings(col)?
                            .into_iter()
                            .map(|v| v.as_deref().and_then(parse_date).map(|d| epoch_days(d) as f64))
                            .collect();
                        Column::new(name, days)
                    }
                    _ => Column::new(name, column_strings(col)?),
                };
                Ok(prepared)
            })
            .collect::<Result<Vec<Column>>>()?;

        Ok(DataFrame::new(columns)?)
    }
}

/// Suffix repeated names with `_2`, `_3`, ... so every output name is distinct.
fn unique_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{}_{}", name, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling::ColumnProfiler;

    fn fitted(df: &DataFrame, target: &str) -> FeatureTransformer {
        let profile = ColumnProfiler::new().profile(df).unwrap();
        let mut transformer = FeatureTransformer::new();
        transformer.fit(df, &profile, target).unwrap();
        transformer
    }

    #[test]
    fn test_numeric_and_categorical_features() {
        let df = df!(
            "x" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "color" => &["red", "blue", "red", "blue", "red", "red"],
            "y" => &[0, 1, 0, 1, 0, 0]
        )
        .unwrap();

        let transformer = fitted(&df, "y");
        assert_eq!(transformer.feature_names(), &["x", "color_red", "color_blue"]);
        assert_eq!(transformer.input_columns(), vec!["x", "color"]);

        let x = transformer.transform(&df).unwrap();
        assert_eq!(x.dim(), (6, 3));
        let mean: f64 = x.column(0).sum() / 6.0;
        assert!(mean.abs() < 1e-10);
        assert_eq!(x[[0, 1]], 1.0);
        assert_eq!(x[[1, 2]], 1.0);
    }

    #[test]
    fn test_indicator_name_colliding_with_column() {
        let df = df!(
            "color" => &["red", "blue", "red", "blue"],
            "color_red" => &[0.5, 1.5, 2.5, 3.5],
            "y" => &[0, 1, 0, 1]
        )
        .unwrap();

        let transformer = fitted(&df, "y");
        assert_eq!(transformer.feature_names(), &["color_red", "color_blue", "color_red_2"]);

        let x = transformer.transform(&df).unwrap();
        assert_eq!(x.dim(), (4, 3));
        assert_eq!(x.column(0).to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(x.column(1).to_vec(), vec![0.0, 1.0, 0.0, 1.0]);
        assert!(x[[0, 2]] < 0.0 && x[[3, 2]] > 0.0);
    }

    #[test]
    fn test_indicator_names_colliding_across_columns() {
        let df = df!(
            "a_b" => &["c", "c", "d", "d"],
            "a" => &["b_c", "x", "b_c", "x"],
            "y" => &[0, 1, 0, 1]
        )
        .unwrap();

        let transformer = fitted(&df, "y");
        assert_eq!(transformer.feature_names(), &["a_b_c", "a_b_d", "a_b_c_2", "a_x"]);
        assert_eq!(transformer.transform(&df).unwrap().dim(), (4, 4));
    }

    #[test]
    fn test_datetime_feature_is_scaled() {
        let df = df!(
            "when" => &["2023-01-01", "2023-01-02", "2023-01-03"],
            "v" => &[1.0, 2.0, 3.0]
        )
        .unwrap();
        let transformer = fitted(&df, "v");
        let x = transformer.transform(&df).unwrap();
        assert_eq!(x.dim(), (3, 1));
        assert!(x[[0, 0]] < 0.0 && x[[2, 0]] > 0.0);
        assert!(x[[1, 0]].abs() < 1e-10);
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let train = df!("a" => &[1.0, 2.0], "b" => &[3.0, 4.0], "c" => &[0, 1]).unwrap();
        let transformer = fitted(&train, "c");

        let new = df!("a" => &[1.0], "c" => &[0]).unwrap();
        let err = transformer.transform(&new).unwrap_err();
        assert!(matches!(err, MycsvError::SchemaMismatch(ref m) if m.contains('b')));
    }

    #[test]
    fn test_extra_columns_ignored() {
        let train = df!("a" => &[1.0, 2.0, 3.0], "y" => &[0, 1, 0]).unwrap();
        let transformer = fitted(&train, "y");
        let new = df!("zzz" => &["q"], "a" => &[2.0]).unwrap();
        let x = transformer.transform(&new).unwrap();
        assert_eq!(x.dim(), (1, 1));
        assert!(x[[0, 0]].abs() < 1e-10);
    }

    #[test]
    fn test_target_only_table_rejected() {
        let df = df!("y" => &[1.0, 2.0]).unwrap();
        let profile = ColumnProfiler::new().profile(&df).unwrap();
        let err = FeatureTransformer::new().fit(&df, &profile, "y").unwrap_err();
        assert_eq!(err.reason_code(), "empty_or_degenerate_table");
    }
}
