//! Standard scaling for feature columns and the regression target

use crate::error::{MycsvError, Result};
use crate::utils::frame::column_f64;
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters for a fitted standardization: `(x - center) / scale`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

impl ScalerParams {
    /// Mean and population standard deviation; a zero or undefined spread
    /// becomes 1 so constant columns map to 0.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { center: 0.0, scale: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        Self {
            center: mean,
            scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
        }
    }

    #[inline]
    pub fn apply(&self, v: f64) -> f64 {
        (v - self.center) / self.scale
    }

    #[inline]
    pub fn invert(&self, v: f64) -> f64 {
        v * self.scale + self.center
    }
}

/// Per-column standard scaler over a DataFrame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scaler {
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the scaler to the listed (numeric) columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for name in columns {
            let column = df
                .column(name)
                .map_err(|_| MycsvError::SchemaMismatch(format!("column '{}' not found", name)))?;
            let values: Vec<f64> = column_f64(column)?.into_iter().flatten().collect();
            self.params.insert(name.clone(), ScalerParams::fit(&values));
        }
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace each fitted column by its standardized Float64 version.
    /// Missing values take the column mean, i.e. 0 after scaling.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(MycsvError::ModelNotFitted);
        }

        let replacements = self
            .params
            .iter()
            .filter_map(|(name, params)| {
                df.column(name)
                    .ok()
                    .map(|column| Self::scale_column(column, params))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }
        Ok(result)
    }

    pub fn params(&self, column: &str) -> Option<&ScalerParams> {
        self.params.get(column)
    }

    /// Standardized values of one fitted column; missing values become 0.
    pub fn scale(&self, column: &Column) -> Result<Vec<f64>> {
        let params = self.params.get(column.name().as_str()).ok_or_else(|| {
            MycsvError::SchemaMismatch(format!("column '{}' was not fitted", column.name()))
        })?;
        Self::scaled_values(column, params)
    }

    fn scaled_values(column: &Column, params: &ScalerParams) -> Result<Vec<f64>> {
        Ok(column_f64(column)?
            .into_iter()
            .map(|opt| opt.map_or(0.0, |v| params.apply(v)))
            .collect())
    }

    fn scale_column(column: &Column, params: &ScalerParams) -> Result<Series> {
        let scaled = Self::scaled_values(column, params)?;
        Ok(Series::new(column.name().clone(), scaled))
    }
}

/// Invertible standardization of the regression target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetScaler {
    params: ScalerParams,
}

impl TargetScaler {
    pub fn fit(y: &Array1<f64>) -> Self {
        let values: Vec<f64> = y.iter().copied().filter(|v| v.is_finite()).collect();
        Self {
            params: ScalerParams::fit(&values),
        }
    }

    pub fn transform(&self, y: &Array1<f64>) -> Array1<f64> {
        y.mapv(|v| self.params.apply(v))
    }

    pub fn inverse_transform(&self, y: &Array1<f64>) -> Array1<f64> {
        y.mapv(|v| self.params.invert(v))
    }

    pub fn mean(&self) -> f64 {
        self.params.center
    }

    pub fn std(&self) -> f64 {
        self.params.scale
    }
}
