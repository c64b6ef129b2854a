//! Text Extractor Port - Turns uploaded bytes into prompt-ready text.
//!
//! The engine only consumes the output: raw text plus an optional
//! structured summary, which prompts prefer when present.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::workflow::ExtractedDocument;

/// Port for document text extraction.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extracts text from an uploaded document.
    ///
    /// The document id is derived from the content, so re-uploading the
    /// same bytes yields the same origin tag.
    async fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError>;

    /// True if the extractor handles files with this name.
    fn supports(&self, file_name: &str) -> bool;
}

/// Errors that can occur during text extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Unsupported document format: {file_name}")]
    UnsupportedFormat { file_name: String },

    #[error("Document is not valid text: {file_name}")]
    NotText { file_name: String },

    #[error("Document contains no text: {file_name}")]
    Empty { file_name: String },

    #[error("Document too large: {size_bytes} bytes (max: {max_bytes})")]
    TooLarge { size_bytes: usize, max_bytes: usize },
}

impl ExtractionError {
    /// Creates an unsupported format error.
    pub fn unsupported(file_name: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            file_name: file_name.into(),
        }
    }

    /// Creates a not-text error.
    pub fn not_text(file_name: impl Into<String>) -> Self {
        Self::NotText {
            file_name: file_name.into(),
        }
    }

    /// Creates an empty document error.
    pub fn empty(file_name: impl Into<String>) -> Self {
        Self::Empty {
            file_name: file_name.into(),
        }
    }
}
