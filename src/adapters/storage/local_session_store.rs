//! Local Filesystem Session Store - Implementation of SessionFileStore.
//!
//! Keeps uploaded files per session on the local filesystem so they can be
//! re-extracted on later turns, and releases them on cleanup or inactivity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::foundation::{DocumentId, SessionId, Timestamp};
use crate::ports::{
    CleanupReport, SessionFileStore, SessionSummary, StorageError, StoredFile,
};

/// Maximum upload size allowed (10 MB).
const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Separates the document id from the original file name on disk.
const NAME_SEPARATOR: &str = "__";

/// Local filesystem storage for session uploads.
///
/// # Directory Structure
///
/// ```text
/// {base_path}/
/// ├── 5f0c.../                       (session id)
/// │   ├── 3fa85f6457b2__io_list.csv
/// │   └── 9c1d2e3f4a5b__spec.txt
/// └── 8e21.../
///     └── 0a1b2c3d4e5f__drives.txt
/// ```
///
/// Writes go to a dot-prefixed temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct LocalSessionFileStore {
    /// Base directory for all session storage.
    base_path: PathBuf,
    max_file_size: u64,
}

impl LocalSessionFileStore {
    /// Creates a new store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            max_file_size: MAX_FILE_SIZE_BYTES,
        }
    }

    /// Overrides the per-file size limit.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn session_dir(&self, session_id: SessionId) -> PathBuf {
        self.base_path.join(session_id.to_string())
    }

    fn stored_name(document_id: &DocumentId, file_name: &str) -> String {
        format!("{}{}{}", document_id, NAME_SEPARATOR, file_name)
    }

    /// Splits a stored name back into document id and original name.
    fn parse_stored_name(stored: &str) -> Option<(DocumentId, String)> {
        if stored.starts_with('.') {
            return None;
        }
        let (id, name) = stored.split_once(NAME_SEPARATOR)?;
        let document_id = DocumentId::new(id).ok()?;
        Some((document_id, name.to_string()))
    }

    fn validate_file_name(file_name: &str) -> Result<(), StorageError> {
        let trimmed = file_name.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(|c: char| c == '/' || c == '\\')
            || trimmed.contains('\0')
        {
            return Err(StorageError::invalid_file_name(file_name));
        }
        Ok(())
    }

    fn system_time_to_timestamp(system_time: SystemTime) -> Timestamp {
        let datetime: DateTime<Utc> = system_time.into();
        Timestamp::from_datetime(datetime)
    }

    async fn modified_at(path: &Path) -> Result<Timestamp, StorageError> {
        let meta = fs::metadata(path).await.map_err(|e| {
            StorageError::io(format!("Failed to get metadata for {}: {}", path.display(), e))
        })?;
        let modified = meta.modified().map_err(|e| {
            StorageError::io(format!(
                "Failed to get modification time for {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::system_time_to_timestamp(modified))
    }

    /// Session directories currently on disk.
    async fn session_ids(&self) -> Result<Vec<SessionId>, StorageError> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.base_path).await.map_err(|e| {
            StorageError::io(format!(
                "Failed to read storage directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(format!("Failed to read directory entry: {}", e)))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Ok(id) = SessionId::from_str(&entry.file_name().to_string_lossy()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Removes a session directory, returning how many files it held.
    async fn remove_session(&self, session_id: SessionId) -> Result<usize, StorageError> {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            return Ok(0);
        }
        let files = self.list(session_id).await?.len();
        fs::remove_dir_all(&dir).await.map_err(|e| {
            StorageError::io(format!("Failed to remove session directory {}: {}", dir.display(), e))
        })?;
        tracing::debug!(session_id = %session_id, files, "Released session storage");
        Ok(files)
    }

    /// Releases every session whose last activity is before `cutoff`.
    pub async fn cleanup_inactive_before(&self, cutoff: Timestamp) -> Result<CleanupReport, StorageError> {
        let mut report = CleanupReport::default();
        for summary in self.sessions().await? {
            if summary.last_activity < cutoff {
                report.absorb(CleanupReport {
                    sessions_cleaned: 1,
                    files_released: self.remove_session(summary.session_id).await?,
                });
            }
        }
        Ok(report)
    }
}

#[async_trait]
impl SessionFileStore for LocalSessionFileStore {
    async fn store(
        &self,
        session_id: SessionId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError> {
        Self::validate_file_name(file_name)?;
        let file_name = file_name.trim();

        let size = bytes.len() as u64;
        if size > self.max_file_size {
            return Err(StorageError::file_too_large(size, self.max_file_size));
        }

        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::io(format!("Failed to create session directory {}: {}", dir.display(), e))
        })?;

        let document_id = DocumentId::from_content(bytes);
        let stored_name = Self::stored_name(&document_id, file_name);
        let temp_path = dir.join(format!(".{}.tmp", stored_name));
        let final_path = dir.join(&stored_name);

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            StorageError::io(format!("Failed to create temp file {}: {}", temp_path.display(), e))
        })?;
        file.write_all(bytes).await.map_err(|e| {
            StorageError::io(format!("Failed to write to temp file {}: {}", temp_path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::io(format!("Failed to sync temp file {}: {}", temp_path.display(), e))
        })?;
        fs::rename(&temp_path, &final_path).await.map_err(|e| {
            StorageError::io(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            ))
        })?;

        tracing::info!(
            session_id = %session_id,
            document_id = %document_id,
            file_name = %file_name,
            size_bytes = size,
            "Stored session upload"
        );

        Ok(StoredFile {
            session_id,
            document_id,
            file_name: file_name.to_string(),
            size_bytes: size,
            stored_at: Self::modified_at(&final_path).await?,
        })
    }

    async fn load(&self, session_id: SessionId, document_id: &DocumentId) -> Result<Vec<u8>, StorageError> {
        let file = self
            .list(session_id)
            .await?
            .into_iter()
            .find(|f| &f.document_id == document_id)
            .ok_or_else(|| StorageError::not_found(format!("{}/{}", session_id, document_id)))?;

        let path = self
            .session_dir(session_id)
            .join(Self::stored_name(&file.document_id, &file.file_name));
        fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::not_found(path.display().to_string()),
            _ => StorageError::io(format!("Failed to read {}: {}", path.display(), e)),
        })
    }

    async fn list(&self, session_id: SessionId) -> Result<Vec<StoredFile>, StorageError> {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            StorageError::io(format!("Failed to read session directory {}: {}", dir.display(), e))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(format!("Failed to read directory entry: {}", e)))?
        {
            let stored = entry.file_name();
            let Some((document_id, file_name)) = Self::parse_stored_name(&stored.to_string_lossy())
            else {
                continue;
            };

            let path = entry.path();
            let meta = entry.metadata().await.map_err(|e| {
                StorageError::io(format!("Failed to get metadata for {}: {}", path.display(), e))
            })?;
            let modified = meta.modified().map_err(|e| {
                StorageError::io(format!(
                    "Failed to get modification time for {}: {}",
                    path.display(),
                    e
                ))
            })?;

            files.push(StoredFile {
                session_id,
                document_id,
                file_name,
                size_bytes: meta.len(),
                stored_at: Self::system_time_to_timestamp(modified),
            });
        }

        // Oldest first, so uploads replay in order
        files.sort_by(|a, b| {
            a.stored_at
                .cmp(&b.stored_at)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(files)
    }

    async fn cleanup(&self, session_ids: &[SessionId]) -> Result<CleanupReport, StorageError> {
        let mut report = CleanupReport::default();
        for &session_id in session_ids {
            if !self.session_dir(session_id).exists() {
                continue;
            }
            report.absorb(CleanupReport {
                sessions_cleaned: 1,
                files_released: self.remove_session(session_id).await?,
            });
        }

        tracing::info!(
            requested = session_ids.len(),
            sessions_cleaned = report.sessions_cleaned,
            files_released = report.files_released,
            "Session cleanup finished"
        );
        Ok(report)
    }

    async fn cleanup_expired(&self, inactivity: Duration) -> Result<CleanupReport, StorageError> {
        let minutes = (inactivity.as_secs() / 60) as i64;
        let cutoff = Timestamp::now().minus_minutes(minutes);
        let report = self.cleanup_inactive_before(cutoff).await?;

        if report.sessions_cleaned > 0 {
            tracing::info!(
                inactivity_minutes = minutes,
                sessions_cleaned = report.sessions_cleaned,
                files_released = report.files_released,
                "Expired sessions released"
            );
        }
        Ok(report)
    }

    async fn sessions(&self) -> Result<Vec<SessionSummary>, StorageError> {
        let mut summaries = Vec::new();
        for session_id in self.session_ids().await? {
            let files = self.list(session_id).await?;
            let dir_time = Self::modified_at(&self.session_dir(session_id)).await?;

            let created_at = files.iter().map(|f| f.stored_at).min().unwrap_or(dir_time);
            let last_activity = files.iter().map(|f| f.stored_at).max().unwrap_or(dir_time);

            summaries.push(SessionSummary {
                session_id,
                file_count: files.len(),
                created_at,
                last_activity,
            });
        }
        Ok(summaries)
    }
}
