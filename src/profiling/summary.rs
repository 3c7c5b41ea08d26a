//! Descriptive statistics and correlated column pairs for a table

use crate::error::Result;
use crate::utils::frame::{column_f64, is_numeric_dtype};
use serde::{Deserialize, Serialize};
use polars::prelude::*;
use std::fmt;

/// Absolute correlation a pair must exceed to be reported
pub const CORRELATION_THRESHOLD: f64 = 0.3;
/// Maximum number of reported pairs
pub const TOP_CORRELATIONS: usize = 5;

/// Statistics for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub left: String,
    pub right: String,
    pub r: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub n_rows: usize,
    pub n_columns: usize,
    pub numeric: Vec<NumericStats>,
    pub correlations: Vec<CorrelatedPair>,
    /// Missing cells per column, only columns with gaps
    pub missing: Vec<(String, usize)>,
}

impl DatasetSummary {
    pub fn compute(df: &DataFrame) -> Result<Self> {
        let mut numeric_values = Vec::new();
        for col in df.get_columns() {
            if is_numeric_dtype(col.dtype()) {
                numeric_values.push((col.name().to_string(), column_f64(col)?));
            }
        }

        let numeric = numeric_values
            .iter()
            .filter_map(|(name, values)| {
                let observed: Vec<f64> = values.iter().flatten().copied().collect();
                numeric_stats(name, observed)
            })
            .collect();

        let mut correlations = Vec::new();
        for i in 0..numeric_values.len() {
            for j in (i + 1)..numeric_values.len() {
                let (left, a) = &numeric_values[i];
                let (right, b) = &numeric_values[j];
                if let Some(r) = pearson(a, b) {
                    if r.abs() > CORRELATION_THRESHOLD {
                        correlations.push(CorrelatedPair {
                            left: left.clone(),
                            right: right.clone(),
                            r,
                        });
                    }
                }
            }
        }
        // stable sort keeps column order among equal strengths
        correlations.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));
        correlations.truncate(TOP_CORRELATIONS);

        let missing = df
            .get_columns()
            .iter()
            .filter(|c| c.null_count() > 0)
            .map(|c| (c.name().to_string(), c.null_count()))
            .collect();

        Ok(Self {
            n_rows: df.height(),
            n_columns: df.width(),
            numeric,
            correlations,
            missing,
        })
    }
}

fn numeric_stats(name: &str, mut values: Vec<f64>) -> Option<NumericStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    Some(NumericStats {
        column: name.to_string(),
        count: n,
        mean,
        std,
        min: values[0],
        q25: quantile_sorted(&values, 0.25),
        median: quantile_sorted(&values, 0.5),
        q75: quantile_sorted(&values, 0.75),
        max: values[n - 1],
    })
}

/// Linear-interpolation quantile of sorted, non-empty data
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Pearson r over rows where both values are present
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows: {}  Columns: {}", self.n_rows, self.n_columns)?;
        if !self.numeric.is_empty() {
            writeln!(
                f,
                "{:<20} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
                "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
            )?;
            for s in &self.numeric {
                writeln!(
                    f,
                    "{:<20} {:>8} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                    s.column, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
                )?;
            }
        }
        if !self.correlations.is_empty() {
            writeln!(f, "Top correlations:")?;
            for c in &self.correlations {
                writeln!(f, "  {} ~ {}: {:.3}", c.left, c.right, c.r)?;
            }
        }
        for (column, n) in &self.missing {
            writeln!(f, "Missing in {}: {}", column, n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_numeric_stats() {
        let df = df!("a" => &[1.0, 2.0, 3.0, 4.0], "s" => &["x", "y", "z", "w"]).unwrap();
        let summary = DatasetSummary::compute(&df).unwrap();
        assert_eq!(summary.numeric.len(), 1);

        let a = &summary.numeric[0];
        assert_eq!(a.count, 4);
        assert_relative_eq!(a.mean, 2.5);
        assert_relative_eq!(a.std, (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(a.q25, 1.75);
        assert_relative_eq!(a.median, 2.5);
        assert_relative_eq!(a.q75, 3.25);
        assert_eq!((a.min, a.max), (1.0, 4.0));
    }

    #[test]
    fn test_correlations_ranked() {
        let df = df!(
            "x" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "y" => &[2.0, 4.0, 6.0, 8.0, 10.0],
            "z" => &[5.0, 3.0, 4.0, 1.0, 2.0],
            "w" => &[1.0, -1.0, 1.0, -1.0, 1.0]
        )
        .unwrap();
        let summary = DatasetSummary::compute(&df).unwrap();
        let first = &summary.correlations[0];
        assert_eq!((first.left.as_str(), first.right.as_str()), ("x", "y"));
        assert_relative_eq!(first.r, 1.0, epsilon = 1e-12);
        assert!(summary.correlations.iter().all(|c| c.r.abs() > CORRELATION_THRESHOLD));
        assert!(summary
            .correlations
            .windows(2)
            .all(|w| w[0].r.abs() >= w[1].r.abs()));
    }

    #[test]
    fn test_constant_column_has_no_correlation() {
        assert_eq!(pearson(&[Some(1.0), Some(1.0)], &[Some(1.0), Some(2.0)]), None);
    }

    #[test]
    fn test_missing_counts() {
        let df = DataFrame::new(vec![Column::new("a".into(), &[Some(1.0), None, Some(2.0)])]).unwrap();
        let summary = DatasetSummary::compute(&df).unwrap();
        assert_eq!(summary.missing, vec![("a".to_string(), 1)]);
        assert_eq!(summary.numeric[0].count, 2);
    }
}
