//! Ingestion: encoding detection and delimited-text parsing
//!
//! Raw bytes of unknown encoding are sniffed by [`EncodingDetector`] and
//! turned into a polars `DataFrame` by [`TableIngestor`], which retries with
//! a fallback encoding and without a header row before giving up.

mod encoding;
mod reader;

pub use encoding::{is_utf8, Detection, EncodingDetector, EncodingInfo, DEFAULT_SAMPLE_BYTES};
pub use reader::TableIngestor;

use serde::{Deserialize, Serialize};

/// Tokens read as missing values in addition to empty fields
pub const DEFAULT_NULL_TOKENS: &[&str] = &["NA", "N/A", "NULL", "null", "NaN", "nan", "None", "#N/A"];

/// Configuration for reading raw bytes into a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Bytes inspected by the encoding detector
    pub detection_sample_bytes: usize,
    /// Guesses at or below this confidence fall back to UTF-8
    pub min_confidence: f64,
    /// Fail with `EncodingUndetected` instead of assuming UTF-8
    pub strict_detection: bool,
    /// Single-byte encoding retried after a decode failure
    pub fallback_encoding: String,
    /// Parse at most this many data rows (preview mode)
    pub sample_rows: Option<usize>,
    /// Rows used by polars for dtype inference
    pub infer_schema_length: Option<usize>,
    /// Cell values treated as missing
    pub null_tokens: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            detection_sample_bytes: DEFAULT_SAMPLE_BYTES,
            min_confidence: 0.5,
            strict_detection: false,
            fallback_encoding: "ISO-8859-1".to_string(),
            sample_rows: None,
            infer_schema_length: Some(10_000),
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = Some(rows);
        self
    }

    pub fn with_strict_detection(mut self, strict: bool) -> Self {
        self.strict_detection = strict;
        self
    }

    pub fn with_null_tokens(mut self, tokens: Vec<String>) -> Self {
        self.null_tokens = tokens;
        self
    }

    pub fn detector(&self) -> EncodingDetector {
        EncodingDetector::new()
            .with_sample_size(self.detection_sample_bytes)
            .with_min_confidence(self.min_confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.detection_sample_bytes, 100_000);
        assert_eq!(config.fallback_encoding, "ISO-8859-1");
        assert!(config.null_tokens.iter().any(|t| t == "NULL"));
        assert!(config.sample_rows.is_none());
    }

    #[test]
    fn test_builder() {
        let config = IngestConfig::new().with_sample_rows(50).with_strict_detection(true);
        assert_eq!(config.sample_rows, Some(50));
        assert!(config.strict_detection);
    }
}
