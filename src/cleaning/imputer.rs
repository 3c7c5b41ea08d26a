//! Missing value imputation: median for numeric columns, most frequent
//! value for textual and boolean columns

use crate::error::{MycsvError, Result};
use crate::utils::frame::{column_f64, is_numeric_dtype};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with median (numeric only)
    Median,
    /// Replace with mode / most frequent value
    MostFrequent,
}

impl ImputeStrategy {
    /// Strategy applied to a column of the given dtype, if any
    pub fn for_dtype(dtype: &DataType) -> Option<Self> {
        if is_numeric_dtype(dtype) {
            Some(ImputeStrategy::Median)
        } else if matches!(dtype, DataType::String | DataType::Boolean) {
            Some(ImputeStrategy::MostFrequent)
        } else {
            None
        }
    }
}

/// Value used to fill a column's gaps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeValue {
    Numeric(f64),
    Text(String),
    Flag(bool),
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Imputer {
    fill_values: HashMap<String, ImputeValue>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute a fill value for every listed column that has gaps and at
    /// least one observed value.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.fill_values.clear();
        for name in columns {
            let col = df
                .column(name)
                .map_err(|_| MycsvError::SchemaMismatch(format!("column '{}' not found", name)))?;
            if col.null_count() == 0 || col.null_count() == col.len() {
                continue;
            }
            if let Some(value) = Self::compute_fill_value(col)? {
                self.fill_values.insert(name.clone(), value);
            }
        }
        self.is_fitted = true;
        Ok(self)
    }

    /// Fill gaps, leaving row `skip_row` untouched when given. Returns the
    /// filled frame and the number of cells imputed per column.
    pub fn transform(
        &self,
        df: &DataFrame,
        skip_row: Option<usize>,
    ) -> Result<(DataFrame, HashMap<String, usize>)> {
        if !self.is_fitted {
            return Err(MycsvError::ModelNotFitted);
        }

        let mut result = df.clone();
        let mut counts = HashMap::new();
        for (name, value) in &self.fill_values {
            let Ok(col) = df.column(name) else { continue };
            let (filled, n) = Self::fill_column(col, value, skip_row)?;
            if n > 0 {
                result.with_column(filled)?;
                counts.insert(name.clone(), n);
            }
        }
        Ok((result, counts))
    }

    pub fn fill_value(&self, column: &str) -> Option<&ImputeValue> {
        self.fill_values.get(column)
    }

    fn compute_fill_value(col: &Column) -> Result<Option<ImputeValue>> {
        let value = match ImputeStrategy::for_dtype(col.dtype()) {
            Some(ImputeStrategy::Median) => {
                let values: Vec<f64> = column_f64(col)?.into_iter().flatten().collect();
                median(&values).map(ImputeValue::Numeric)
            }
            Some(ImputeStrategy::MostFrequent) if col.dtype() == &DataType::Boolean => {
                most_frequent(col.bool()?.into_iter().flatten()).map(ImputeValue::Flag)
            }
            Some(ImputeStrategy::MostFrequent) => {
                most_frequent(col.str()?.into_iter().flatten()).map(|s| ImputeValue::Text(s.to_string()))
            }
            None => None,
        };
        Ok(value)
    }

    fn fill_column(
        col: &Column,
        value: &ImputeValue,
        skip_row: Option<usize>,
    ) -> Result<(Series, usize)> {
        let name = col.name().clone();
        let mut filled_cells = 0usize;
        let mut fill = |idx: usize, missing: bool| {
            let fills = missing && Some(idx) != skip_row;
            filled_cells += usize::from(fills);
            fills
        };

        let series = match value {
            ImputeValue::Numeric(v) => {
                // Integer columns are widened so a fractional median fits.
                let ca: Float64Chunked = column_f64(col)?
                    .into_iter()
                    .enumerate()
                    .map(|(i, opt)| if fill(i, opt.is_none()) { Some(*v) } else { opt })
                    .collect();
                ca.with_name(name).into_series()
            }
            ImputeValue::Text(v) => {
                let ca: StringChunked = col
                    .str()?
                    .into_iter()
                    .enumerate()
                    .map(|(i, opt)| if fill(i, opt.is_none()) { Some(v.as_str()) } else { opt })
                    .collect();
                ca.with_name(name).into_series()
            }
            ImputeValue::Flag(v) => {
                let ca: BooleanChunked = col
                    .bool()?
                    .into_iter()
                    .enumerate()
                    .map(|(i, opt)| if fill(i, opt.is_none()) { Some(*v) } else { opt })
                    .collect();
                ca.with_name(name).into_series()
            }
        };
        Ok((series, filled_cells))
    }
}

/// Median with the midpoint rule for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent value; ties resolve to the smallest value.
pub fn most_frequent<T: Ord, I: IntoIterator<Item = T>>(values: I) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_most_frequent_ties_pick_smallest() {
        assert_eq!(most_frequent(vec!["b", "a", "b", "a", "c"]), Some("a"));
        assert_eq!(most_frequent(vec![true, true, false]), Some(true));
        assert_eq!(most_frequent(Vec::<i32>::new()), None);
    }

    #[test]
    fn test_median_imputation() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), &[Some(1.0), None, Some(3.0), Some(4.0)]),
        ])
        .unwrap();

        let mut imputer = Imputer::new();
        imputer.fit(&df, &["a".to_string()]).unwrap();
        let (result, counts) = imputer.transform(&df, None).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        assert_eq!(col.get(1), Some(3.0));
        assert_eq!(counts.get("a"), Some(&1));
    }

    #[test]
    fn test_integer_column_widened() {
        let df = DataFrame::new(vec![Column::new("n".into(), &[Some(1i64), Some(2), None, Some(3), Some(4)])])
            .unwrap();
        let mut imputer = Imputer::new();
        imputer.fit(&df, &["n".to_string()]).unwrap();
        let (result, _) = imputer.transform(&df, None).unwrap();
        let col = result.column("n").unwrap();
        assert_eq!(col.dtype(), &DataType::Float64);
        assert_eq!(col.f64().unwrap().get(2), Some(2.5));
    }

    #[test]
    fn test_mode_imputation_and_skip_row() {
        let df = DataFrame::new(vec![Column::new(
            "c".into(),
            &[None, Some("x"), None, Some("x"), Some("y")],
        )])
        .unwrap();
        let mut imputer = Imputer::new();
        imputer.fit(&df, &["c".to_string()]).unwrap();
        let (result, counts) = imputer.transform(&df, Some(0)).unwrap();
        let col = result.column("c").unwrap().str().unwrap().clone();
        assert_eq!(col.get(0), None);
        assert_eq!(col.get(2), Some("x"));
        assert_eq!(counts.get("c"), Some(&1));
    }

    #[test]
    fn test_all_missing_column_untouched() {
        let df = DataFrame::new(vec![Column::new("z".into(), &[None::<f64>, None])]).unwrap();
        let mut imputer = Imputer::new();
        imputer.fit(&df, &["z".to_string()]).unwrap();
        assert!(imputer.fill_value("z").is_none());
    }

    #[test]
    fn test_transform_requires_fit() {
        let df = df!("a" => &[1.0]).unwrap();
        assert!(matches!(Imputer::new().transform(&df, None), Err(MycsvError::ModelNotFitted)));
    }
}
