//! Plain text extractor adapter.
//!
//! Handles UTF-8 text uploads: I/O lists, specification notes, CSV exports
//! and existing Structured Text sources. Binary formats are rejected so a
//! dedicated extractor can be put in front of this one.
//!
//! Lines shaped like `key: value` or `key = value` are collected into a
//! structured summary, which prompts prefer over the raw text.

use async_trait::async_trait;

use crate::domain::foundation::DocumentId;
use crate::domain::workflow::ExtractedDocument;
use crate::ports::{ExtractionError, TextExtractor};

/// Maximum upload size accepted for extraction (2 MB).
const MAX_TEXT_BYTES: usize = 2 * 1024 * 1024;

/// Key/value lines kept in a summary.
const MAX_SUMMARY_ENTRIES: usize = 200;

/// Longest key considered a specification label rather than prose.
const MAX_KEY_CHARS: usize = 48;

/// File extensions treated as text.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "csv", "tsv", "json", "yaml", "yml", "ini", "cfg", "conf", "log", "st",
    "scl", "iec", "xml",
];

/// UTF-8 text extractor.
#[derive(Debug, Clone)]
pub struct PlainTextExtractor {
    max_bytes: usize,
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PlainTextExtractor {
    /// Creates an extractor with the default size limit.
    pub fn new() -> Self {
        Self {
            max_bytes: MAX_TEXT_BYTES,
        }
    }

    /// Overrides the size limit.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn extension(file_name: &str) -> Option<String> {
        let (_, ext) = file_name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }

    /// Decodes bytes as UTF-8 text, normalising line endings.
    fn decode(file_name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        if bytes.contains(&0) {
            return Err(ExtractionError::not_text(file_name));
        }
        let text = std::str::from_utf8(bytes).map_err(|_| ExtractionError::not_text(file_name))?;
        Ok(text.replace("\r\n", "\n").replace('\r', "\n"))
    }

    /// Splits a line into a specification label and value.
    fn key_value(line: &str) -> Option<(&str, &str)> {
        let line = line.trim().trim_start_matches(|c: char| matches!(c, '-' | '*' | '#')).trim();
        let (key, value) = match (line.find(':'), line.find('=')) {
            (Some(c), Some(e)) => line.split_at(c.min(e)),
            (Some(i), None) | (None, Some(i)) => line.split_at(i),
            (None, None) => return None,
        };
        let key = key.trim();
        let value = value[1..].trim().trim_end_matches(';').trim();

        if key.is_empty()
            || value.is_empty()
            || key.chars().count() > MAX_KEY_CHARS
            || key.contains("://")
            || value.starts_with("//")
        {
            return None;
        }
        Some((key, value))
    }

    /// Builds a summary from key/value lines, if there are any.
    fn summarize(file_name: &str, text: &str) -> Option<String> {
        let entries: Vec<String> = text
            .lines()
            .filter_map(Self::key_value)
            .take(MAX_SUMMARY_ENTRIES)
            .map(|(key, value)| format!("- {}: {}", key, value))
            .collect();

        if entries.is_empty() {
            return None;
        }
        Some(format!("Specifications from {}:\n{}", file_name, entries.join("\n")))
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
        if !self.supports(file_name) {
            return Err(ExtractionError::unsupported(file_name));
        }
        if bytes.len() > self.max_bytes {
            return Err(ExtractionError::TooLarge {
                size_bytes: bytes.len(),
                max_bytes: self.max_bytes,
            });
        }

        let text = Self::decode(file_name, bytes)?;
        if text.trim().is_empty() {
            return Err(ExtractionError::empty(file_name));
        }

        let mut document = ExtractedDocument::new(DocumentId::from_content(bytes), file_name, text.trim());
        if let Some(summary) = Self::summarize(file_name, &text) {
            document = document.with_summary(summary);
        }

        tracing::debug!(
            file_name = %file_name,
            document_id = %document.id,
            chars = document.raw_text.chars().count(),
            has_summary = document.structured_summary.is_some(),
            "Extracted text document"
        );
        Ok(document)
    }

    fn supports(&self, file_name: &str) -> bool {
        match Self::extension(file_name) {
            Some(ext) => TEXT_EXTENSIONS.contains(&ext.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = "Conveyor line spec\r\n\
        motor_power: 5.5 kW\r\n\
        max_speed = 1.2 m/s;\r\n\
        See http://example.com for details\r\n\
        The operator presses start and the belt runs.\r\n";

    #[tokio::test]
    async fn extracts_text_and_summary() {
        let doc = PlainTextExtractor::new().extract("spec.txt", SPEC.as_bytes()).await.unwrap();

        assert_eq!(doc.name, "spec.txt");
        assert_eq!(doc.id, DocumentId::from_content(SPEC.as_bytes()));
        assert!(!doc.raw_text.contains('\r'));
        let summary = doc.structured_summary.unwrap();
        assert!(summary.starts_with("Specifications from spec.txt:"));
        assert!(summary.contains("- motor_power: 5.5 kW"));
        assert!(summary.contains("- max_speed: 1.2 m/s"));
        assert!(!summary.contains("http"));
    }

    #[tokio::test]
    async fn prose_only_has_no_summary() {
        let doc = PlainTextExtractor::new()
            .extract("notes.md", b"The tank fills until the high level switch trips.")
            .await
            .unwrap();

        assert!(doc.structured_summary.is_none());
        assert!(!doc.is_blank());
    }

    #[tokio::test]
    async fn rejects_binary_content() {
        let err = PlainTextExtractor::new()
            .extract("dump.txt", &[0x50, 0x4b, 0x03, 0x04, 0x00, 0x00])
            .await
            .unwrap_err();

        assert_eq!(err, ExtractionError::not_text("dump.txt"));
    }

    #[tokio::test]
    async fn rejects_invalid_utf8() {
        let err = PlainTextExtractor::new()
            .extract("latin1.txt", &[0x66, 0x6f, 0xe9, 0x20])
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::NotText { .. }));
    }

    #[tokio::test]
    async fn rejects_unsupported_extension() {
        let err = PlainTextExtractor::new()
            .extract("manual.pdf", b"%PDF-1.7")
            .await
            .unwrap_err();

        assert_eq!(err, ExtractionError::unsupported("manual.pdf"));
    }

    #[tokio::test]
    async fn rejects_whitespace_only() {
        let err = PlainTextExtractor::new()
            .extract("empty.txt", b"  \n\t\n")
            .await
            .unwrap_err();

        assert_eq!(err, ExtractionError::empty("empty.txt"));
    }

    #[tokio::test]
    async fn rejects_oversized_upload() {
        let err = PlainTextExtractor::new()
            .with_max_bytes(4)
            .extract("big.txt", b"hello world")
            .await
            .unwrap_err();

        assert_eq!(err, ExtractionError::TooLarge { size_bytes: 11, max_bytes: 4 });
    }

    #[tokio::test]
    async fn strips_utf8_bom() {
        let doc = PlainTextExtractor::new()
            .extract("io.csv", b"\xEF\xBB\xBFinput: %I0.0")
            .await
            .unwrap();

        assert_eq!(doc.raw_text, "input: %I0.0");
    }

    #[test]
    fn supports_text_extensions_and_bare_names() {
        let extractor = PlainTextExtractor::new();
        assert!(extractor.supports("main.ST"));
        assert!(extractor.supports("README"));
        assert!(!extractor.supports("drawing.dwg"));
    }

    #[test]
    fn key_value_prefers_first_separator() {
        assert_eq!(
            PlainTextExtractor::key_value("- setpoint = temp: 80C"),
            Some(("setpoint", "temp: 80C"))
        );
        assert_eq!(PlainTextExtractor::key_value("// comment only"), None);
        assert_eq!(PlainTextExtractor::key_value("label:"), None);
    }
}
