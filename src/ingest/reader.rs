//! Delimited-text ingestion with encoding and header fallbacks

use super::{Detection, IngestConfig};
use crate::error::{MycsvError, Result};
use encoding_rs::Encoding;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads raw bytes into a `DataFrame`
#[derive(Debug, Clone, Default)]
pub struct TableIngestor {
    config: IngestConfig,
}

impl TableIngestor {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Detect the encoding of `bytes` and parse them.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<DataFrame> {
        let detection = self.config.detector().detect(bytes);
        self.read(bytes, &detection)
    }

    /// Read a file from disk.
    pub fn read_path(&self, path: &Path) -> Result<DataFrame> {
        let bytes = std::fs::read(path)?;
        info!(path = %path.display(), bytes = bytes.len(), "Reading table");
        self.read_bytes(&bytes)
    }

    /// Parse `bytes` using a previously computed detection.
    pub fn read(&self, bytes: &[u8], detection: &Detection) -> Result<DataFrame> {
        let text = self.decode(bytes, detection)?;
        if text.trim().is_empty() {
            return Err(MycsvError::EmptyOrDegenerateTable(
                "input contains no data".to_string(),
            ));
        }

        let df = self.parse(text.as_bytes().to_vec(), true)?;
        if !is_degenerate(&df) {
            debug!(rows = df.height(), cols = df.width(), "Parsed table with header");
            return Ok(df);
        }

        warn!(
            rows = df.height(),
            cols = df.width(),
            "Degenerate table, retrying without header row"
        );
        let df = self
            .parse(text.into_bytes(), false)
            .map_err(|e| MycsvError::EmptyOrDegenerateTable(e.to_string()))?;
        if is_degenerate(&df) {
            return Err(MycsvError::EmptyOrDegenerateTable(format!(
                "{} rows x {} columns after header fallback",
                df.height(),
                df.width()
            )));
        }
        Ok(df)
    }

    /// Decode to UTF-8 text, falling back to the configured single-byte encoding.
    fn decode(&self, bytes: &[u8], detection: &Detection) -> Result<String> {
        let primary = match detection {
            Detection::Detected(info) => info.encoding(),
            Detection::Undetected if self.config.strict_detection => {
                return Err(MycsvError::EncodingUndetected);
            }
            Detection::Undetected => Some(encoding_rs::UTF_8),
        };

        if let Some(encoding) = primary {
            let (text, used, had_errors) = encoding.decode(bytes);
            if !had_errors {
                debug!(encoding = used.name(), "Decoded input");
                return Ok(text.into_owned());
            }
            warn!(encoding = encoding.name(), "Decode failed, using fallback encoding");
        }

        let fallback = Encoding::for_label(self.config.fallback_encoding.as_bytes())
            .ok_or_else(|| {
                MycsvError::DecodeFailure(format!(
                    "unknown fallback encoding '{}'",
                    self.config.fallback_encoding
                ))
            })?;
        let (text, _, had_errors) = fallback.decode(bytes);
        if had_errors {
            return Err(MycsvError::DecodeFailure(format!(
                "input is not valid {}",
                fallback.name()
            )));
        }
        Ok(text.into_owned())
    }

    fn parse(&self, utf8: Vec<u8>, has_header: bool) -> Result<DataFrame> {
        let null_values = NullValues::AllColumns(
            self.config
                .null_tokens
                .iter()
                .map(|t| PlSmallStr::from(t.as_str()))
                .collect(),
        );
        let parse_options = CsvParseOptions::default().with_null_values(Some(null_values));

        CsvReadOptions::default()
            .with_has_header(has_header)
            .with_infer_schema_length(self.config.infer_schema_length)
            .with_n_rows(self.config.sample_rows)
            .with_parse_options(parse_options)
            .into_reader_with_file_handle(Cursor::new(utf8))
            .finish()
            .map_err(|e| MycsvError::ParseFailure(e.to_string()))
    }
}

/// Zero rows, zero columns, or a single column (delimiter mis-detection symptom)
fn is_degenerate(df: &DataFrame) -> bool {
    df.height() == 0 || df.width() <= 1
}
