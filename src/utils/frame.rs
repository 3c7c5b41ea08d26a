//! Small DataFrame helpers shared by the cleaning, profiling and
//! transformation stages

use crate::error::Result;
use polars::prelude::*;
use std::collections::HashSet;

/// Check if dtype is numeric
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

pub fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Numeric view of a column. Values that cannot be cast become `None`.
pub fn column_f64(col: &Column) -> Result<Vec<Option<f64>>> {
    let casted = col.cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Textual view of a column, cast through polars' string conversion.
pub fn column_strings(col: &Column) -> Result<Vec<Option<String>>> {
    let casted = col.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Per-row missing flags for one column
pub fn null_mask(col: &Column) -> Vec<bool> {
    if col.null_count() == 0 {
        return vec![false; col.len()];
    }
    col.as_materialized_series()
        .is_null()
        .into_iter()
        .map(|v| v.unwrap_or(false))
        .collect()
}

/// Per-row flag: does any column hold a missing value in this row?
pub fn rows_with_missing(df: &DataFrame) -> Vec<bool> {
    let mut flags = vec![false; df.height()];
    for col in df.get_columns() {
        if col.null_count() == 0 {
            continue;
        }
        for (flag, missing) in flags.iter_mut().zip(null_mask(col)) {
            *flag |= missing;
        }
    }
    flags
}

/// One string key per row, equal iff the rows are equal cell by cell.
pub fn row_keys(df: &DataFrame) -> Result<Vec<String>> {
    let mut keys = vec![String::new(); df.height()];
    for col in df.get_columns() {
        for (key, cell) in keys.iter_mut().zip(column_strings(col)?) {
            match cell {
                Some(value) => {
                    key.push('\u{1}');
                    key.push_str(&value);
                }
                None => key.push('\u{0}'),
            }
            key.push('\u{1f}');
        }
    }
    Ok(keys)
}

/// First-occurrence mask over the rows of `df`
pub fn first_occurrence_mask(df: &DataFrame) -> Result<Vec<bool>> {
    let keys = row_keys(df)?;
    let mut seen = HashSet::with_capacity(keys.len());
    Ok(keys.into_iter().map(|k| seen.insert(k)).collect())
}

/// Keep the rows where `keep` is true, preserving order.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    Ok(df.filter(&mask)?)
}

/// Rebuild the frame from the named columns, in the given order.
pub fn select_columns(df: &DataFrame, names: &[String]) -> Result<DataFrame> {
    let columns = names
        .iter()
        .map(|name| df.column(name).cloned())
        .collect::<PolarsResult<Vec<Column>>>()?;
    Ok(DataFrame::new(columns)?)
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}
