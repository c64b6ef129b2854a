//! CleanupSessionsHandler - Command handler for releasing session uploads.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::SessionId;
use crate::ports::{CleanupReport, SessionFileStore};

use super::HousekeepingError;

/// Command to release storage for specific sessions.
#[derive(Debug, Clone, Default)]
pub struct CleanupSessionsCommand {
    pub session_ids: Vec<SessionId>,
}

/// Handler for session cleanup.
pub struct CleanupSessionsHandler {
    store: Arc<dyn SessionFileStore>,
    session_timeout: Duration,
}

impl CleanupSessionsHandler {
    pub fn new(store: Arc<dyn SessionFileStore>, session_timeout: Duration) -> Self {
        Self {
            store,
            session_timeout,
        }
    }

    /// Releases the named sessions. Unknown ids are ignored.
    pub async fn handle(&self, cmd: CleanupSessionsCommand) -> Result<CleanupReport, HousekeepingError> {
        if cmd.session_ids.is_empty() {
            return Ok(CleanupReport::default());
        }

        let report = self.store.cleanup(&cmd.session_ids).await?;
        if report.sessions_cleaned < cmd.session_ids.len() {
            tracing::debug!(
                requested = cmd.session_ids.len(),
                found = report.sessions_cleaned,
                "Some sessions held no storage"
            );
        }
        Ok(report)
    }

    /// Releases every session idle for longer than the configured timeout.
    pub async fn handle_expired(&self) -> Result<CleanupReport, HousekeepingError> {
        Ok(self.store.cleanup_expired(self.session_timeout).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalSessionFileStore;
    use tempfile::TempDir;

    fn create_handler(timeout: Duration) -> (CleanupSessionsHandler, Arc<LocalSessionFileStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalSessionFileStore::new(dir.path()));
        (CleanupSessionsHandler::new(store.clone(), timeout), store, dir)
    }

    #[tokio::test]
    async fn releases_named_sessions() {
        let (handler, store, _dir) = create_handler(Duration::from_secs(3600));
        let keep = SessionId::new();
        let released = SessionId::new();
        store.store(released, "io.csv", b"input: %I0.0").await.unwrap();
        store.store(released, "spec.txt", b"motor: 5 kW").await.unwrap();
        store.store(keep, "spec.txt", b"pump: 2 kW").await.unwrap();

        let report = handler
            .handle(CleanupSessionsCommand {
                session_ids: vec![released, SessionId::new()],
            })
            .await
            .unwrap();

        assert_eq!(report.sessions_cleaned, 1);
        assert_eq!(report.files_released, 2);
        assert_eq!(store.list(keep).await.unwrap().len(), 1);
        assert!(store.list(released).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_command_is_a_no_op() {
        let (handler, store, _dir) = create_handler(Duration::from_secs(3600));
        let session = SessionId::new();
        store.store(session, "spec.txt", b"motor: 5 kW").await.unwrap();

        let report = handler.handle(CleanupSessionsCommand::default()).await.unwrap();

        assert_eq!(report, CleanupReport::default());
        assert_eq!(store.list(session).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn expired_cleanup_keeps_active_sessions() {
        let (handler, store, _dir) = create_handler(Duration::from_secs(3600));
        let session = SessionId::new();
        store.store(session, "spec.txt", b"motor: 5 kW").await.unwrap();

        let report = handler.handle_expired().await.unwrap();

        assert_eq!(report.sessions_cleaned, 0);
        assert_eq!(store.list(session).await.unwrap().len(), 1);
    }
}
