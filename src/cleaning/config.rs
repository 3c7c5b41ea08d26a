//! Cleaning configuration

use serde::{Deserialize, Serialize};

/// Thresholds and column selections for the cleaning pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Keep only these columns (in this order) before cleaning
    pub columns_to_include: Option<Vec<String>>,
    /// Restrict date normalization and imputation to these columns
    pub columns_to_clean: Option<Vec<String>>,
    /// Cell values replaced by missing before cleaning
    pub null_tokens: Vec<String>,
    /// Minimum share of non-missing values that must parse for a column to be date-like
    pub date_parse_threshold: f64,
    /// Columns with a larger missing share are dropped
    pub max_missing_fraction: f64,
    /// Rows with missing values are dropped when their share is below this
    pub row_drop_threshold: f64,
    /// Never impute the originally-first record (legacy behavior)
    pub preserve_first_row_gaps: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            columns_to_include: None,
            columns_to_clean: None,
            null_tokens: vec!["NA".to_string(), "NULL".to_string(), "null".to_string()],
            date_parse_threshold: 0.8,
            max_missing_fraction: 0.4,
            row_drop_threshold: 0.10,
            preserve_first_row_gaps: false,
        }
    }
}

impl CleaningConfig {
    /// Create a new cleaning config with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns_to_include = Some(columns);
        self
    }

    pub fn with_columns_to_clean(mut self, columns: Vec<String>) -> Self {
        self.columns_to_clean = Some(columns);
        self
    }

    pub fn with_preserve_first_row_gaps(mut self, preserve: bool) -> Self {
        self.preserve_first_row_gaps = preserve;
        self
    }

    pub fn with_null_tokens(mut self, tokens: Vec<String>) -> Self {
        self.null_tokens = tokens;
        self
    }

    /// Whether steps scoped by `columns_to_clean` apply to `column`
    pub fn should_clean(&self, column: &str) -> bool {
        self.columns_to_clean
            .as_ref()
            .map_or(true, |cols| cols.iter().any(|c| c == column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = CleaningConfig::default();
        assert_eq!(config.date_parse_threshold, 0.8);
        assert_eq!(config.max_missing_fraction, 0.4);
        assert_eq!(config.row_drop_threshold, 0.10);
        assert!(!config.preserve_first_row_gaps);
    }

    #[test]
    fn test_should_clean() {
        let config = CleaningConfig::new().with_columns_to_clean(vec!["a".to_string()]);
        assert!(config.should_clean("a"));
        assert!(!config.should_clean("b"));
        assert!(CleaningConfig::new().should_clean("anything"));
    }
}
