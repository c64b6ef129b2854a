//! Session File Store Port - Temporary per-session upload storage.
//!
//! Housekeeping outside the workflow engine: uploads are kept per session
//! so they can be re-extracted, and released on cleanup or inactivity.
//!
//! # File Organization
//!
//! ```text
//! {base_path}/{session_id}/{document_id}__{file_name}
//! ```

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::foundation::{DocumentId, SessionId, Timestamp};

/// Port for session-scoped file storage.
#[async_trait]
pub trait SessionFileStore: Send + Sync {
    /// Stores an upload, returning its content-derived document id.
    ///
    /// Storing identical bytes twice in one session replaces the file.
    async fn store(
        &self,
        session_id: SessionId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError>;

    /// Reads a stored upload back.
    async fn load(&self, session_id: SessionId, document_id: &DocumentId) -> Result<Vec<u8>, StorageError>;

    /// Lists the files stored for a session.
    async fn list(&self, session_id: SessionId) -> Result<Vec<StoredFile>, StorageError>;

    /// Releases all storage for the given sessions.
    ///
    /// Unknown sessions are ignored.
    async fn cleanup(&self, session_ids: &[SessionId]) -> Result<CleanupReport, StorageError>;

    /// Releases sessions with no activity for longer than `inactivity`.
    async fn cleanup_expired(&self, inactivity: Duration) -> Result<CleanupReport, StorageError>;

    /// Summaries of every session currently holding storage.
    async fn sessions(&self) -> Result<Vec<SessionSummary>, StorageError>;
}

/// A stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub session_id: SessionId,
    pub document_id: DocumentId,
    pub file_name: String,
    pub size_bytes: u64,
    pub stored_at: Timestamp,
}

/// Storage held by one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub file_count: usize,
    /// First upload (or directory creation).
    pub created_at: Timestamp,
    /// Most recent upload.
    pub last_activity: Timestamp,
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub sessions_cleaned: usize,
    pub files_released: usize,
}

impl CleanupReport {
    /// Adds another report's counts to this one.
    pub fn absorb(&mut self, other: CleanupReport) {
        self.sessions_cleaned += other.sessions_cleaned;
        self.files_released += other.files_released;
    }
}

/// Errors that can occur during file storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// File was not found.
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// IO error during file operation.
    #[error("IO error: {message}")]
    Io { message: String },

    /// File name cannot be stored safely.
    #[error("Invalid file name: {file_name}")]
    InvalidFileName { file_name: String },

    /// File is too large.
    #[error("File too large: {size_bytes} bytes (max: {max_bytes})")]
    FileTooLarge { size_bytes: u64, max_bytes: u64 },
}

impl StorageError {
    /// Creates a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an IO error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an invalid file name error.
    pub fn invalid_file_name(file_name: impl Into<String>) -> Self {
        Self::InvalidFileName {
            file_name: file_name.into(),
        }
    }

    /// Creates a file too large error.
    pub fn file_too_large(size_bytes: u64, max_bytes: u64) -> Self {
        Self::FileTooLarge {
            size_bytes,
            max_bytes,
        }
    }
}
