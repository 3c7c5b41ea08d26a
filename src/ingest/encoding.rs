//! Statistical text-encoding detection over a byte sample

use crate::error::Result;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Default number of leading bytes inspected for detection
pub const DEFAULT_SAMPLE_BYTES: usize = 100_000;

/// A detected encoding with its confidence in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingInfo {
    /// WHATWG label, e.g. `UTF-8` or `windows-1252`
    pub label: String,
    pub confidence: f64,
}

impl EncodingInfo {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Resolve the label to an `encoding_rs` codec
    pub fn encoding(&self) -> Option<&'static Encoding> {
        Encoding::for_label(self.label.as_bytes())
    }
}

/// Outcome of encoding detection. Detection itself never fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Detection {
    Detected(EncodingInfo),
    Undetected,
}

impl Detection {
    pub fn label(&self) -> Option<&str> {
        match self {
            Detection::Detected(info) => Some(info.label.as_str()),
            Detection::Undetected => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, Detection::Detected(_))
    }
}

/// Returns true if the bytes are valid UTF-8
pub fn is_utf8(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}

/// Guesses the character encoding of a byte sample
#[derive(Debug, Clone)]
pub struct EncodingDetector {
    sample_size: usize,
    min_confidence: f64,
}

impl Default for EncodingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingDetector {
    pub fn new() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_BYTES,
            min_confidence: 0.5,
        }
    }

    /// Set the number of bytes sampled by [`detect_reader`](Self::detect_reader)
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    /// Guesses at or below this confidence are reported as UTF-8
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Detect the encoding of `bytes`, looking at most at `sample_size` bytes.
    pub fn detect(&self, bytes: &[u8]) -> Detection {
        let sample = &bytes[..bytes.len().min(self.sample_size)];
        if sample.is_empty() {
            return Detection::Undetected;
        }

        // A truncated sample may split a multi-byte sequence at the end.
        if is_utf8(sample) || valid_utf8_prefix(sample) {
            return Detection::Detected(EncodingInfo::new(encoding_rs::UTF_8.name(), 1.0));
        }

        let mut detector = chardetng::EncodingDetector::new();
        detector.feed(sample, sample.len() == bytes.len());
        let guess = detector.guess(None, true);

        let (_, had_errors) = guess.decode_without_bom_handling(sample);
        let confidence = if had_errors { 0.5 } else { 0.99 };

        // a guess that cannot decode the sample cleanly falls back under defaults
        let info = if confidence <= self.min_confidence {
            EncodingInfo::new(encoding_rs::UTF_8.name(), confidence)
        } else {
            EncodingInfo::new(guess.name(), confidence)
        };
        debug!(label = %info.label, confidence = info.confidence, "Detected encoding");
        Detection::Detected(info)
    }

    /// Detect the encoding of a seekable stream. The stream position is
    /// restored before returning, on success and on error.
    pub fn detect_reader<R: Read + Seek>(&self, reader: &mut R) -> Result<Detection> {
        let start = reader.stream_position()?;
        let mut sample = Vec::with_capacity(self.sample_size.min(DEFAULT_SAMPLE_BYTES));
        let read = reader
            .by_ref()
            .take(self.sample_size as u64)
            .read_to_end(&mut sample);
        reader.seek(SeekFrom::Start(start))?;
        read?;

        Ok(self.detect(&sample))
    }
}

/// Valid UTF-8 except for an incomplete sequence at the very end.
fn valid_utf8_prefix(sample: &[u8]) -> bool {
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && sample.len() - e.valid_up_to() < 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_detect_utf8() {
        let detection = EncodingDetector::new().detect("name,city\nJosé,Zürich\n".as_bytes());
        assert_eq!(detection.label(), Some("UTF-8"));
    }

    #[test]
    fn test_detect_empty_is_undetected() {
        let detection = EncodingDetector::new().detect(&[]);
        assert_eq!(detection, Detection::Undetected);
        assert!(!detection.is_detected());
    }

    #[test]
    fn test_detect_latin1_bytes() {
        // "café,naïve" in ISO-8859-1 is not valid UTF-8
        let bytes = b"word,other\ncaf\xe9,na\xefve\ncr\xe8me,br\xfbl\xe9e\n";
        let detection = EncodingDetector::new().detect(bytes);
        let label = detection.label().expect("should detect something");
        assert_ne!(label, "UTF-8");
        let info = match detection {
            Detection::Detected(info) => info,
            Detection::Undetected => unreachable!(),
        };
        assert!(info.encoding().is_some());
    }

    #[test]
    fn test_guess_at_threshold_falls_back_to_utf8() {
        let bytes = b"word,other\ncaf\xe9,na\xefve\ncr\xe8me,br\xfbl\xe9e\n";
        let detection = EncodingDetector::new().with_min_confidence(0.99).detect(bytes);
        assert_eq!(detection, Detection::Detected(EncodingInfo::new("UTF-8", 0.99)));

        let detection = EncodingDetector::new().with_min_confidence(0.98).detect(bytes);
        assert_ne!(detection.label(), Some("UTF-8"));
    }

    #[test]
    fn test_truncated_multibyte_sample_is_utf8() {
        let text = "aé".repeat(10);
        let bytes = text.as_bytes();
        // cut in the middle of the two-byte 'é'
        let detector = EncodingDetector::new().with_sample_size(bytes.len() - 1);
        assert_eq!(detector.detect(bytes).label(), Some("UTF-8"));
    }

    #[test]
    fn test_detect_reader_restores_position() {
        let mut cursor = Cursor::new(b"a,b\n1,2\n3,4\n".to_vec());
        cursor.set_position(2);
        let detection = EncodingDetector::new()
            .with_sample_size(4)
            .detect_reader(&mut cursor)
            .unwrap();
        assert!(detection.is_detected());
        assert_eq!(cursor.position(), 2);
    }
}
