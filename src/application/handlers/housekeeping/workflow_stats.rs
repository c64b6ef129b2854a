//! WorkflowStatsHandler - Read-only query over session storage and usage.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::ports::{SessionFileStore, SessionSummary, UsageSummary, UsageTracker};

use super::HousekeepingError;

/// Query for workflow statistics.
#[derive(Debug, Clone, Default)]
pub struct GetWorkflowStatsQuery;

/// Aggregate view of session storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub total_files_tracked: usize,
    pub average_age_minutes: f64,
    pub oldest_age_minutes: f64,
    pub timeout_minutes: u64,
}

impl SessionStats {
    /// Aggregates session summaries as seen at `now`.
    pub fn from_summaries(summaries: &[SessionSummary], now: &Timestamp, timeout: Duration) -> Self {
        let ages: Vec<f64> = summaries
            .iter()
            .map(|s| s.created_at.age_minutes(now).max(0.0))
            .collect();

        let average_age_minutes = if ages.is_empty() {
            0.0
        } else {
            ages.iter().sum::<f64>() / ages.len() as f64
        };

        Self {
            active_sessions: summaries.len(),
            total_files_tracked: summaries.iter().map(|s| s.file_count).sum(),
            average_age_minutes,
            oldest_age_minutes: ages.iter().copied().fold(0.0, f64::max),
            timeout_minutes: timeout.as_secs() / 60,
        }
    }
}

/// Result of the statistics query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowStats {
    pub sessions: SessionStats,
    pub usage: UsageSummary,
}

/// Handler for workflow statistics.
pub struct WorkflowStatsHandler {
    store: Arc<dyn SessionFileStore>,
    usage: Arc<dyn UsageTracker>,
    session_timeout: Duration,
}

impl WorkflowStatsHandler {
    pub fn new(
        store: Arc<dyn SessionFileStore>,
        usage: Arc<dyn UsageTracker>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            store,
            usage,
            session_timeout,
        }
    }

    pub async fn handle(&self, _query: GetWorkflowStatsQuery) -> Result<WorkflowStats, HousekeepingError> {
        let summaries = self.store.sessions().await?;
        let usage = self.usage.get_summary().await?;

        Ok(WorkflowStats {
            sessions: SessionStats::from_summaries(&summaries, &Timestamp::now(), self.session_timeout),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DocumentId, SessionId};
    use crate::ports::{CleanupReport, StorageError, StoredFile, UsageRecord, UsageTrackerError};
    use async_trait::async_trait;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    struct FixedStore {
        summaries: Vec<SessionSummary>,
    }

    #[async_trait]
    impl SessionFileStore for FixedStore {
        async fn store(
            &self,
            _session_id: SessionId,
            _file_name: &str,
            _bytes: &[u8],
        ) -> Result<StoredFile, StorageError> {
            Err(StorageError::io("read-only"))
        }

        async fn load(&self, _session_id: SessionId, document_id: &DocumentId) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::not_found(document_id.as_str()))
        }

        async fn list(&self, _session_id: SessionId) -> Result<Vec<StoredFile>, StorageError> {
            Ok(Vec::new())
        }

        async fn cleanup(&self, _session_ids: &[SessionId]) -> Result<CleanupReport, StorageError> {
            Ok(CleanupReport::default())
        }

        async fn cleanup_expired(&self, _inactivity: Duration) -> Result<CleanupReport, StorageError> {
            Ok(CleanupReport::default())
        }

        async fn sessions(&self) -> Result<Vec<SessionSummary>, StorageError> {
            Ok(self.summaries.clone())
        }
    }

    struct FixedUsage {
        fail: bool,
    }

    #[async_trait]
    impl UsageTracker for FixedUsage {
        async fn record_usage(&self, _record: UsageRecord) -> Result<(), UsageTrackerError> {
            Ok(())
        }

        async fn get_summary(&self) -> Result<UsageSummary, UsageTrackerError> {
            if self.fail {
                return Err(UsageTrackerError::Storage("unavailable".into()));
            }
            Ok(UsageSummary::from_records(
                [
                    UsageRecord::new("req-1", None, "gpt-4o", 100, 50, 3),
                    UsageRecord::new("req-2", None, "gpt-4o-mini", 200, 20, 1),
                ]
                .iter(),
            ))
        }

        async fn get_request_summary(&self, _request_id: &str) -> Result<UsageSummary, UsageTrackerError> {
            Ok(UsageSummary::default())
        }
    }

    fn summary(age_minutes: i64, files: usize, now: &Timestamp) -> SessionSummary {
        SessionSummary {
            session_id: SessionId::new(),
            file_count: files,
            created_at: now.minus_minutes(age_minutes),
            last_activity: *now,
        }
    }

    mod aggregation {
        use super::*;

        #[test]
        fn no_sessions_reports_zeroes() {
            let stats = SessionStats::from_summaries(&[], &Timestamp::now(), Duration::from_secs(3600));

            assert_eq!(stats.active_sessions, 0);
            assert_eq!(stats.total_files_tracked, 0);
            assert_eq!(stats.average_age_minutes, 0.0);
            assert_eq!(stats.oldest_age_minutes, 0.0);
            assert_eq!(stats.timeout_minutes, 60);
        }

        #[test]
        fn averages_and_oldest_use_creation_time() {
            let now = Timestamp::now();
            let summaries = vec![summary(10, 2, &now), summary(30, 1, &now)];

            let stats = SessionStats::from_summaries(&summaries, &now, Duration::from_secs(1800));

            assert_eq!(stats.active_sessions, 2);
            assert_eq!(stats.total_files_tracked, 3);
            assert!((stats.average_age_minutes - 20.0).abs() < 1e-9);
            assert!((stats.oldest_age_minutes - 30.0).abs() < 1e-9);
            assert_eq!(stats.timeout_minutes, 30);
        }
    }

    mod handler {
        use super::*;

        #[tokio::test]
        async fn combines_sessions_and_usage() {
            let now = Timestamp::now();
            let handler = WorkflowStatsHandler::new(
                Arc::new(FixedStore {
                    summaries: vec![summary(5, 4, &now)],
                }),
                Arc::new(FixedUsage { fail: false }),
                Duration::from_secs(3600),
            );

            let stats = handler.handle(GetWorkflowStatsQuery).await.unwrap();

            assert_eq!(stats.sessions.active_sessions, 1);
            assert_eq!(stats.sessions.total_files_tracked, 4);
            assert_eq!(stats.usage.request_count, 2);
            assert_eq!(stats.usage.total_tokens, 370);
            assert_eq!(stats.usage.total_cost_cents, 4);
        }

        #[tokio::test]
        async fn usage_failure_is_reported() {
            let handler = WorkflowStatsHandler::new(
                Arc::new(FixedStore { summaries: vec![] }),
                Arc::new(FixedUsage { fail: true }),
                Duration::from_secs(3600),
            );

            let err = handler.handle(GetWorkflowStatsQuery).await.unwrap_err();

            assert!(matches!(err, HousekeepingError::Usage(_)));
        }
    }
}
