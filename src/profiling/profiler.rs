//! Column role classification

use crate::cleaning::dates::parse_date;
use crate::error::Result;
use crate::utils::frame::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Semantic role of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Numeric,
    Categorical,
    Datetime,
    Boolean,
    Text,
    Unsupported,
}

impl ColumnRole {
    /// Roles whose values are expanded into indicator features
    pub fn is_discrete(&self) -> bool {
        matches!(self, ColumnRole::Categorical | ColumnRole::Boolean | ColumnRole::Text)
    }
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnRole::Numeric => "numeric",
            ColumnRole::Categorical => "categorical",
            ColumnRole::Datetime => "datetime",
            ColumnRole::Boolean => "boolean",
            ColumnRole::Text => "text",
            ColumnRole::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Detected column information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub role: ColumnRole,
    /// Polars dtype as text
    pub dtype: String,
    /// Number of distinct non-missing values
    pub n_unique: usize,
    pub n_missing: usize,
}

/// Roles for every column of a table, in column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub columns: Vec<ColumnInfo>,
    pub n_rows: usize,
}

impl ColumnProfile {
    pub fn role(&self, column: &str) -> Option<ColumnRole> {
        self.get(column).map(|c| c.role)
    }

    pub fn get(&self, column: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == column)
    }

    pub fn columns_with_role(&self, role: ColumnRole) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.role == role)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Classifies each column of a cleaned table once
#[derive(Debug, Clone)]
pub struct ColumnProfiler {
    /// unique / rows below this is categorical, otherwise text
    categorical_ratio: f64,
}

impl Default for ColumnProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnProfiler {
    pub fn new() -> Self {
        Self {
            categorical_ratio: 0.5,
        }
    }

    pub fn with_categorical_ratio(mut self, ratio: f64) -> Self {
        self.categorical_ratio = ratio;
        self
    }

    pub fn profile(&self, df: &DataFrame) -> Result<ColumnProfile> {
        let n_rows = df.height();
        let mut columns = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let dtype = col.dtype();
            let (role, n_unique) = if is_numeric_dtype(dtype) {
                (ColumnRole::Numeric, col.n_unique()?.saturating_sub(usize::from(col.null_count() > 0)))
            } else if dtype == &DataType::Boolean {
                let distinct: HashSet<bool> = col.bool()?.into_iter().flatten().collect();
                (ColumnRole::Boolean, distinct.len())
            } else if dtype == &DataType::String {
                self.classify_text(col.str()?, n_rows)
            } else {
                (ColumnRole::Unsupported, 0)
            };

            columns.push(ColumnInfo {
                name: col.name().to_string(),
                role,
                dtype: format!("{}", dtype),
                n_unique,
                n_missing: col.null_count(),
            });
        }

        debug!(
            columns = columns.len(),
            numeric = columns.iter().filter(|c| c.role == ColumnRole::Numeric).count(),
            "Profiled columns"
        );
        Ok(ColumnProfile { columns, n_rows })
    }

    fn classify_text(&self, ca: &StringChunked, n_rows: usize) -> (ColumnRole, usize) {
        let mut distinct = HashSet::new();
        let mut all_dates = true;
        let mut observed = 0usize;
        for value in ca.into_iter().flatten() {
            observed += 1;
            if all_dates && parse_date(value).is_none() {
                all_dates = false;
            }
            distinct.insert(value);
        }

        let n_unique = distinct.len();
        if observed > 0 && all_dates {
            return (ColumnRole::Datetime, n_unique);
        }
        let ratio = if n_rows == 0 { 1.0 } else { n_unique as f64 / n_rows as f64 };
        if ratio < self.categorical_ratio {
            (ColumnRole::Categorical, n_unique)
        } else {
            (ColumnRole::Text, n_unique)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles() {
        let df = df!(
            "num" => &[1.0, 2.0, 3.0, 4.0],
            "flag" => &[true, false, true, true],
            "cat" => &["a", "b", "a", "a"],
            "free" => &["alpha", "beta", "gamma", "delta"],
            "when" => &["2023-01-01", "2023-02-01", "2023-03-01", "2023-04-01"]
        )
        .unwrap();

        let profile = ColumnProfiler::new().profile(&df).unwrap();
        assert_eq!(profile.role("num"), Some(ColumnRole::Numeric));
        assert_eq!(profile.role("flag"), Some(ColumnRole::Boolean));
        assert_eq!(profile.role("cat"), Some(ColumnRole::Categorical));
        assert_eq!(profile.role("free"), Some(ColumnRole::Text));
        assert_eq!(profile.role("when"), Some(ColumnRole::Datetime));
        assert_eq!(profile.get("cat").unwrap().n_unique, 2);
    }

    #[test]
    fn test_low_cardinality_numeric_stays_numeric() {
        let df = df!("n" => &[1, 1, 2, 2, 1, 2], "s" => &["x", "y", "x", "y", "x", "y"]).unwrap();
        let profile = ColumnProfiler::new().profile(&df).unwrap();
        assert_eq!(profile.role("n"), Some(ColumnRole::Numeric));
        assert_eq!(profile.get("n").unwrap().n_unique, 2);
    }

    #[test]
    fn test_partial_dates_are_not_datetime() {
        let df = df!(
            "d" => &["2023-01-01", "2023-01-02", "later", "2023-01-04"],
            "x" => &[1, 2, 3, 4]
        )
        .unwrap();
        let profile = ColumnProfiler::new().profile(&df).unwrap();
        assert_eq!(profile.role("d"), Some(ColumnRole::Text));
        assert_eq!(profile.columns_with_role(ColumnRole::Numeric), vec!["x"]);
    }

    #[test]
    fn test_discrete_roles() {
        assert!(ColumnRole::Categorical.is_discrete());
        assert!(ColumnRole::Boolean.is_discrete());
        assert!(!ColumnRole::Numeric.is_discrete());
        assert!(!ColumnRole::Datetime.is_discrete());
    }
}
