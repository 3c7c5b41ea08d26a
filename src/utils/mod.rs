//! Utility functions and types

pub mod frame;

pub use frame::{column_names, filter_rows, is_numeric_dtype, select_columns};
