//! Error types for the mycsv pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, MycsvError>;

/// Main error type for ingestion, cleaning, training and inference
#[derive(Error, Debug)]
pub enum MycsvError {
    #[error("Could not detect the text encoding of the input")]
    EncodingUndetected,

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Malformed delimited text: {0}")]
    ParseFailure(String),

    #[error("Empty or degenerate table: {0}")]
    EmptyOrDegenerateTable(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("No applicable model family: {0}")]
    NoApplicableModelFamily(String),

    #[error("Serialization failure: {0}")]
    SerializationFailure(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl MycsvError {
    /// Stable machine-readable reason code, used by callers to branch on failures.
    pub fn reason_code(&self) -> &'static str {
        match self {
            MycsvError::EncodingUndetected => "encoding_undetected",
            MycsvError::DecodeFailure(_) => "decode_failure",
            MycsvError::ParseFailure(_) => "parse_failure",
            MycsvError::EmptyOrDegenerateTable(_) => "empty_or_degenerate_table",
            MycsvError::SchemaMismatch(_) => "schema_mismatch",
            MycsvError::NoApplicableModelFamily(_) => "no_applicable_model_family",
            MycsvError::SerializationFailure(_) => "serialization_failure",
            MycsvError::DataError(_) => "data_error",
            MycsvError::TrainingError(_) => "training_error",
            MycsvError::ConfigError(_) => "config_error",
            MycsvError::IoError(_) => "io_error",
            MycsvError::ShapeError { .. } => "shape_error",
            MycsvError::ModelNotFitted => "model_not_fitted",
            MycsvError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<polars::error::PolarsError> for MycsvError {
    fn from(err: polars::error::PolarsError) -> Self {
        MycsvError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for MycsvError {
    fn from(err: serde_json::Error) -> Self {
        MycsvError::SerializationFailure(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MycsvError {
    fn from(err: ndarray::ShapeError) -> Self {
        MycsvError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MycsvError::SchemaMismatch("missing columns: b".to_string());
        assert_eq!(err.to_string(), "Schema mismatch: missing columns: b");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MycsvError = io_err.into();
        assert!(matches!(err, MycsvError::IoError(_)));
        assert_eq!(err.reason_code(), "io_error");
    }

    #[test]
    fn test_json_errors_are_serialization_failures() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: MycsvError = json_err.into();
        assert_eq!(err.reason_code(), "serialization_failure");
    }

    #[test]
    fn test_reason_codes_are_distinct_for_ingest_failures() {
        let codes = [
            MycsvError::EncodingUndetected.reason_code(),
            MycsvError::DecodeFailure(String::new()).reason_code(),
            MycsvError::ParseFailure(String::new()).reason_code(),
            MycsvError::EmptyOrDegenerateTable(String::new()).reason_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
