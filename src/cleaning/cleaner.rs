//! The fixed-order cleaning pipeline

use super::config::CleaningConfig;
use super::dates::{normalize_date, parse_ratio};
use super::imputer::Imputer;
use crate::error::Result;
use crate::utils::frame::{
    column_names, first_occurrence_mask, rows_with_missing, select_columns,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{debug, info};

/// What the cleaning pipeline did to a table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub columns_in: usize,
    pub rows_out: usize,
    pub columns_out: usize,
    pub duplicates_removed: usize,
    pub null_tokens_replaced: usize,
    pub date_columns: Vec<String>,
    pub rows_dropped_by_dates: usize,
    pub dropped_columns: Vec<String>,
    pub rows_dropped_missing: usize,
    pub imputed_cells: BTreeMap<String, usize>,
    /// Rows that became duplicates once cell values were rewritten
    pub duplicates_after_rewrite: usize,
    pub duration_ms: u64,
}

/// Cleaned table plus its report
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub data: DataFrame,
    pub report: CleaningReport,
}

/// Cleans a table with fixed heuristics. Data quality problems never make
/// cleaning fail: malformed cells are missing values handled by the policy.
#[derive(Debug, Clone, Default)]
pub struct DataCleaner {
    config: CleaningConfig,
}

/// Table plus the original row position of each surviving row
struct Tracked {
    df: DataFrame,
    origins: Vec<usize>,
}

impl Tracked {
    fn retain(&mut self, keep: &[bool]) -> Result<usize> {
        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return Ok(0);
        }
        self.df = crate::utils::frame::filter_rows(&self.df, keep)?;
        let mut flags = keep.iter();
        self.origins.retain(|_| *flags.next().unwrap_or(&false));
        Ok(removed)
    }
}

impl DataCleaner {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Run every cleaning step in order.
    pub fn clean(&self, df: DataFrame) -> Result<CleaningOutcome> {
        let start = Instant::now();
        let mut report = CleaningReport {
            rows_in: df.height(),
            columns_in: df.width(),
            ..Default::default()
        };
        let origins = (0..df.height()).collect();
        let mut table = Tracked { df, origins };

        report.duplicates_removed = self.deduplicate(&mut table)?;
        report.null_tokens_replaced = self.replace_null_tokens(&mut table)?;
        self.restrict_columns(&mut table)?;

        report.date_columns = self.detect_date_columns(&table.df)?;
        report.rows_dropped_by_dates = self.normalize_dates(&mut table, &report.date_columns)?;

        report.dropped_columns = self.drop_sparse_columns(&mut table)?;
        report.rows_dropped_missing = self.drop_sparse_rows(&mut table)?;
        report.imputed_cells = self.impute(&mut table)?;
        // Null tokens, date formats and fills can make distinct rows equal.
        let rewrote = report.null_tokens_replaced > 0
            || !report.date_columns.is_empty()
            || !report.imputed_cells.is_empty();
        if rewrote {
            report.duplicates_after_rewrite = self.deduplicate(&mut table)?;
        }

        report.rows_out = table.df.height();
        report.columns_out = table.df.width();
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            columns_in = report.columns_in,
            columns_out = report.columns_out,
            "Cleaning complete"
        );

        Ok(CleaningOutcome {
            data: table.df,
            report,
        })
    }

    /// Exact duplicate rows, first occurrence kept
    fn deduplicate(&self, table: &mut Tracked) -> Result<usize> {
        let keep = first_occurrence_mask(&table.df)?;
        let removed = table.retain(&keep)?;
        debug!(removed, "Deduplicated rows");
        Ok(removed)
    }

    fn replace_null_tokens(&self, table: &mut Tracked) -> Result<usize> {
        if self.config.null_tokens.is_empty() {
            return Ok(0);
        }
        let tokens: HashSet<&str> = self.config.null_tokens.iter().map(String::as_str).collect();
        let mut replaced = 0usize;
        let mut updates = Vec::new();
        for col in table.df.get_columns() {
            if col.dtype() != &DataType::String {
                continue;
            }
            let ca = col.str()?;
            let hits = ca.into_iter().flatten().filter(|v| tokens.contains(v)).count();
            if hits == 0 {
                continue;
            }
            replaced += hits;
            let cleaned: StringChunked = ca
                .into_iter()
                .map(|v| v.filter(|s| !tokens.contains(s)))
                .collect();
            updates.push(cleaned.with_name(col.name().clone()).into_series());
        }
        for series in updates {
            table.df.with_column(series)?;
        }
        Ok(replaced)
    }

    /// Keep only allow-listed columns that exist, in allow-list order.
    fn restrict_columns(&self, table: &mut Tracked) -> Result<()> {
        let Some(allowed) = &self.config.columns_to_include else {
            return Ok(());
        };
        let present: HashSet<String> = column_names(&table.df).into_iter().collect();
        let mut seen = HashSet::new();
        let keep: Vec<String> = allowed
            .iter()
            .filter(|c| present.contains(*c) && seen.insert(c.as_str()))
            .cloned()
            .collect();
        table.df = select_columns(&table.df, &keep)?;
        debug!(columns = keep.len(), "Restricted columns");
        Ok(())
    }

    /// String columns where enough non-missing values parse as dates
    fn detect_date_columns(&self, df: &DataFrame) -> Result<Vec<String>> {
        let mut dates = Vec::new();
        for col in df.get_columns() {
            if col.dtype() != &DataType::String {
                continue;
            }
            let ratio = parse_ratio(col.str()?.into_iter());
            if ratio.is_some_and(|r| r >= self.config.date_parse_threshold) {
                dates.push(col.name().to_string());
            }
        }
        if !dates.is_empty() {
            debug!(?dates, "Detected date columns");
        }
        Ok(dates)
    }

    /// Rewrite each date column as `YYYY-MM-DD`, dropping rows where that
    /// column does not parse. Columns are processed in table order.
    fn normalize_dates(&self, table: &mut Tracked, date_columns: &[String]) -> Result<usize> {
        let mut dropped = 0;
        for name in date_columns {
            if !self.config.should_clean(name) {
                continue;
            }
            let normalized: StringChunked = table
                .df
                .column(name)?
                .str()?
                .into_iter()
                .map(|v| v.and_then(normalize_date))
                .collect();
            let keep: Vec<bool> = normalized.into_iter().map(|v| v.is_some()).collect();
            table
                .df
                .with_column(normalized.with_name(name.as_str().into()).into_series())?;
            let removed = table.retain(&keep)?;
            debug!(column = %name, removed, "Normalized dates");
            dropped += removed;
        }
        Ok(dropped)
    }

    fn drop_sparse_columns(&self, table: &mut Tracked) -> Result<Vec<String>> {
        let height = table.df.height();
        if height == 0 {
            return Ok(Vec::new());
        }
        let mut keep = Vec::new();
        let mut dropped = Vec::new();
        for col in table.df.get_columns() {
            let missing = col.null_count() as f64 / height as f64;
            if missing > self.config.max_missing_fraction {
                dropped.push(col.name().to_string());
            } else {
                keep.push(col.name().to_string());
            }
        }
        if !dropped.is_empty() {
            table.df = select_columns(&table.df, &keep)?;
            debug!(?dropped, "Dropped sparse columns");
        }
        Ok(dropped)
    }

    /// Drop incomplete rows outright when they are rare.
    fn drop_sparse_rows(&self, table: &mut Tracked) -> Result<usize> {
        let height = table.df.height();
        if height == 0 {
            return Ok(0);
        }
        let missing = rows_with_missing(&table.df);
        let share = missing.iter().filter(|m| **m).count() as f64 / height as f64;
        if share == 0.0 || share >= self.config.row_drop_threshold {
            return Ok(0);
        }
        let keep: Vec<bool> = missing.iter().map(|m| !m).collect();
        let removed = table.retain(&keep)?;
        debug!(removed, "Dropped rows with missing values");
        Ok(removed)
    }

    fn impute(&self, table: &mut Tracked) -> Result<BTreeMap<String, usize>> {
        let targets: Vec<String> = column_names(&table.df)
            .into_iter()
            .filter(|c| self.config.should_clean(c))
            .collect();

        let mut imputer = Imputer::new();
        imputer.fit(&table.df, &targets)?;

        let skip_row = if self.config.preserve_first_row_gaps {
            table.origins.iter().position(|&o| o == 0)
        } else {
            None
        };
        let (df, counts) = imputer.transform(&table.df, skip_row)?;
        table.df = df;
        Ok(counts.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(df: DataFrame) -> CleaningOutcome {
        DataCleaner::default().clean(df).unwrap()
    }

    #[test]
    fn test_dedup_keeps_first_in_order() {
        let df = df!(
            "a" => &[3, 1, 3, 2, 1],
            "b" => &["x", "y", "x", "z", "y"]
        )
        .unwrap();
        let out = clean(df);
        let a: Vec<Option<i32>> = out.data.column("a").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(3), Some(1), Some(2)]);
        assert_eq!(out.report.duplicates_removed, 2);
    }

    #[test]
    fn test_column_allow_list() {
        let df = df!("a" => &[1, 2], "b" => &[3, 4], "c" => &[5, 6]).unwrap();
        let cleaner = DataCleaner::new(
            CleaningConfig::new().with_columns(vec!["c".into(), "missing".into(), "a".into()]),
        );
        let out = cleaner.clean(df).unwrap();
        assert_eq!(column_names(&out.data), vec!["c", "a"]);
    }

    #[test]
    fn test_date_normalization_drops_unparseable_rows() {
        let df = df!(
            "when" => &["2023-01-05", "01/06/2023", "Jan 7, 2023", "2023/01/08", "garbage"],
            "v" => &[1, 2, 3, 4, 5]
        )
        .unwrap();
        let out = clean(df);
        let when = out.data.column("when").unwrap().str().unwrap().clone();
        let values: Vec<&str> = when.into_iter().flatten().collect();
        assert_eq!(values, vec!["2023-01-05", "2023-01-06", "2023-01-07", "2023-01-08"]);
        assert_eq!(out.report.rows_dropped_by_dates, 1);
        assert_eq!(out.report.date_columns, vec!["when".to_string()]);
    }

    #[test]
    fn test_low_date_ratio_is_not_date_like() {
        let df = df!(
            "mixed" => &["2023-01-05", "apple", "pear", "plum", "2023-01-09"],
            "v" => &[1, 2, 3, 4, 5]
        )
        .unwrap();
        let out = clean(df);
        assert!(out.report.date_columns.is_empty());
        assert_eq!(out.data.height(), 5);
    }

    #[test]
    fn test_sparse_column_dropped() {
        let df = DataFrame::new(vec![
            Column::new("dense".into(), &[1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::new("sparse".into(), &[Some(1.0), None, None, None, Some(2.0)]),
        ])
        .unwrap();
        let out = clean(df);
        assert_eq!(out.report.dropped_columns, vec!["sparse".to_string()]);
        assert_eq!(out.data.width(), 1);
    }

    #[test]
    fn test_rare_missing_rows_dropped() {
        let values: Vec<Option<f64>> = (0..20)
            .map(|i| if i == 7 { None } else { Some(i as f64) })
            .collect();
        let ids: Vec<i64> = (0..20).collect();
        let df = DataFrame::new(vec![
            Column::new("id".into(), ids),
            Column::new("x".into(), values),
        ])
        .unwrap();
        let out = clean(df);
        assert_eq!(out.data.height(), 19);
        assert_eq!(out.report.rows_dropped_missing, 1);
        assert_eq!(out.data.column("x").unwrap().null_count(), 0);
    }

    #[test]
    fn test_common_missing_is_imputed() {
        let df = DataFrame::new(vec![
            Column::new("id".into(), &[1i64, 2, 3, 4, 5, 6]),
            Column::new("x".into(), &[None, Some(1.0), Some(2.0), None, Some(10.0), Some(3.0)]),
            Column::new(
                "c".into(),
                &[Some("a"), Some("b"), Some("b"), Some("a"), None, Some("b")],
            ),
        ])
        .unwrap();
        let out = clean(df);
        assert_eq!(out.data.height(), 6);
        let x = out.data.column("x").unwrap().f64().unwrap().clone();
        assert_eq!(x.get(0), Some(2.5));
        assert_eq!(x.get(3), Some(2.5));
        let c = out.data.column("c").unwrap().str().unwrap().clone();
        assert_eq!(c.get(4), Some("b"));
        assert_eq!(out.report.imputed_cells.get("x"), Some(&2));
    }

    #[test]
    fn test_preserve_first_row_gaps() {
        let df = DataFrame::new(vec![
            Column::new("id".into(), &[1i64, 2, 3, 4, 5, 6]),
            Column::new("x".into(), &[None, Some(1.0), Some(2.0), None, Some(10.0), Some(3.0)]),
        ])
        .unwrap();
        let cleaner = DataCleaner::new(CleaningConfig::new().with_preserve_first_row_gaps(true));
        let out = cleaner.clean(df).unwrap();
        let x = out.data.column("x").unwrap().f64().unwrap().clone();
        assert_eq!(x.get(0), None);
        assert_eq!(x.get(3), Some(2.5));
    }

    #[test]
    fn test_null_tokens_replaced() {
        let df = df!(
            "id" => &[1, 2, 3, 4],
            "c" => &["x", "NULL", "x", "y"]
        )
        .unwrap();
        let out = clean(df);
        assert_eq!(out.report.null_tokens_replaced, 1);
        // 25% of rows incomplete: imputed with the mode
        let c = out.data.column("c").unwrap().str().unwrap().clone();
        assert_eq!(c.get(1), Some("x"));
    }

    #[test]
    fn test_rows_equal_after_date_normalization_are_deduplicated() {
        let df = df!(
            "when" => &["2023-01-05", "01/05/2023", "2023-01-06", "2023-01-07"],
            "v" => &[1, 1, 2, 3]
        )
        .unwrap();
        let out = clean(df);
        assert_eq!(out.report.duplicates_removed, 0);
        assert_eq!(out.report.duplicates_after_rewrite, 1);
        assert_eq!(out.data.height(), 3);
        let v: Vec<Option<i32>> = out.data.column("v").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(v, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_columns_to_clean_limits_imputation() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), &[Some(1.0), None, Some(3.0), Some(5.0)]),
            Column::new("b".into(), &[Some(1.0), None, Some(3.0), Some(4.0)]),
        ])
        .unwrap();
        let cleaner = DataCleaner::new(CleaningConfig::new().with_columns_to_clean(vec!["a".into()]));
        let out = cleaner.clean(df).unwrap();
        assert_eq!(out.data.column("a").unwrap().null_count(), 0);
        assert_eq!(out.data.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn test_empty_table_passes_through() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), Vec::<f64>::new()),
            Column::new("b".into(), Vec::<String>::new()),
        ])
        .unwrap();
        let out = clean(df);
        assert_eq!(out.data.shape(), (0, 2));
    }
}
