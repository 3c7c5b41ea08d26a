//! Categorical encoding: indicator (one-hot) features for discrete feature
//! columns and label indices for classification targets

use crate::error::{MycsvError, Result};
use crate::utils::frame::{column_f64, column_strings, is_integer_dtype, is_numeric_dtype};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One-hot encoder. Categories are kept in first-seen order; unseen and
/// missing values encode to all zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: HashMap<String, Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the encoder to the listed columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for name in columns {
            let column = df
                .column(name)
                .map_err(|_| MycsvError::SchemaMismatch(format!("column '{}' not found", name)))?;
            self.categories.insert(name.clone(), Self::build_categories(column)?);
        }
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace each fitted column by one Float64 indicator column per category
    /// named `{column}_{category}`.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(MycsvError::ModelNotFitted);
        }

        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let name = column.name().as_str();
            match self.categories.get(name) {
                Some(categories) => columns.extend(Self::indicator_columns(column, categories)?),
                None => columns.push(column.clone()),
            }
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Indicator values for one fitted column, one vector per category in
    /// fitted order.
    pub fn indicators(&self, column: &Column) -> Result<Vec<Vec<f64>>> {
        let categories = self.categories.get(column.name().as_str()).ok_or_else(|| {
            MycsvError::SchemaMismatch(format!("column '{}' was not fitted", column.name()))
        })?;
        Self::indicator_values(column, categories)
    }

    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.categories.get(column).map(Vec::as_slice)
    }

    /// Output names for one fitted column
    pub fn feature_names(&self, column: &str) -> Vec<String> {
        self.categories(column)
            .unwrap_or_default()
            .iter()
            .map(|cat| format!("{}_{}", column, cat))
            .collect()
    }

    fn build_categories(column: &Column) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(column_strings(column)?
            .into_iter()
            .flatten()
            .filter(|v| seen.insert(v.clone()))
            .collect())
    }

    fn indicator_columns(column: &Column, categories: &[String]) -> Result<Vec<Column>> {
        Ok(Self::indicator_values(column, categories)?
            .into_iter()
            .zip(categories)
            .map(|(indicator, cat)| Column::new(format!("{}_{}", column.name(), cat).into(), indicator))
            .collect())
    }

    fn indicator_values(column: &Column, categories: &[String]) -> Result<Vec<Vec<f64>>> {
        let values = column_strings(column)?;
        let index: HashMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let codes: Vec<Option<usize>> = values
            .iter()
            .map(|v| v.as_deref().and_then(|s| index.get(s).copied()))
            .collect();

        Ok((0..categories.len())
            .map(|k| {
                codes
                    .iter()
                    .map(|code| if *code == Some(k) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }
}

/// Maps class labels to indices `0..k` over the sorted distinct labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LabelEncoder {
    Text { classes: Vec<String> },
    Numeric { classes: Vec<f64>, integer: bool },
}

impl LabelEncoder {
    /// Fit on a target column. Missing values are ignored.
    pub fn fit(column: &Column) -> Result<Self> {
        if is_numeric_dtype(column.dtype()) {
            let mut classes: Vec<f64> = column_f64(column)?.into_iter().flatten().collect();
            classes.sort_by(|a, b| a.total_cmp(b));
            classes.dedup();
            Ok(LabelEncoder::Numeric {
                classes,
                integer: is_integer_dtype(column.dtype()),
            })
        } else {
            let mut classes: Vec<String> = column_strings(column)?.into_iter().flatten().collect();
            classes.sort();
            classes.dedup();
            Ok(LabelEncoder::Text { classes })
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            LabelEncoder::Text { classes } => classes.len(),
            LabelEncoder::Numeric { classes, .. } => classes.len(),
        }
    }

    pub fn class_names(&self) -> Vec<String> {
        match self {
            LabelEncoder::Text { classes } => classes.clone(),
            LabelEncoder::Numeric { classes, .. } => classes.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Class index per row; `None` for missing or unknown labels.
    pub fn encode(&self, column: &Column) -> Result<Vec<Option<usize>>> {
        match self {
            LabelEncoder::Text { classes } => Ok(column_strings(column)?
                .into_iter()
                .map(|v| v.and_then(|s| classes.binary_search(&s).ok()))
                .collect()),
            LabelEncoder::Numeric { classes, .. } => Ok(column_f64(column)?
                .into_iter()
                .map(|v| v.and_then(|x| classes.binary_search_by(|c| c.total_cmp(&x)).ok()))
                .collect()),
        }
    }

    /// Turn predicted indices back into a labelled Series
    pub fn decode(&self, name: &str, indices: &Array1<f64>) -> Result<Series> {
        let lookup = |v: f64| -> Result<usize> {
            let idx = v.round();
            if idx < 0.0 || idx as usize >= self.n_classes() {
                return Err(MycsvError::InvalidInput(format!(
                    "predicted class index {} out of range",
                    v
                )));
            }
            Ok(idx as usize)
        };

        let series = match self {
            LabelEncoder::Text { classes } => {
                let labels = indices
                    .iter()
                    .map(|&v| lookup(v).map(|i| classes[i].as_str()))
                    .collect::<Result<Vec<_>>>()?;
                Series::new(name.into(), labels)
            }
            LabelEncoder::Numeric { classes, integer: true } => {
                let labels = indices
                    .iter()
                    .map(|&v| lookup(v).map(|i| classes[i] as i64))
                    .collect::<Result<Vec<_>>>()?;
                Series::new(name.into(), labels)
            }
            LabelEncoder::Numeric { classes, integer: false } => {
                let labels = indices
                    .iter()
                    .map(|&v| lookup(v).map(|i| classes[i]))
                    .collect::<Result<Vec<_>>>()?;
                Series::new(name.into(), labels)
            }
        };
        Ok(series)
    }
}
