//! In-memory usage tracker implementation.
//!
//! This adapter provides an in-memory implementation of the `UsageTracker`
//! port. It also implements `AIEventCallback`, so it can be attached to a
//! `ModelCascade` directly and record every successful attempt as it happens.
//!
//! Usage is append-only monitoring and does not persist across restarts.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::model_cascade::{events, AIEventCallback};
use crate::ports::{UsageRecord, UsageSummary, UsageTracker, UsageTrackerError};

/// In-memory implementation of the UsageTracker port.
///
/// Thread-safe via internal `Mutex`.
///
/// # Example
///
/// ```ignore
/// let tracker = Arc::new(InMemoryUsageTracker::new());
/// let cascade = ModelCascade::new(candidates).with_event_callback(tracker.clone());
///
/// // ... run interactions ...
///
/// let summary = tracker.get_summary().await?;
/// println!("{} tokens, {} cents", summary.total_tokens, summary.total_cost_cents);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryUsageTracker {
    records: Mutex<Vec<UsageRecord>>,
}

impl InMemoryUsageTracker {
    /// Creates a new empty usage tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<UsageRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns all recorded usage records.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.guard().clone()
    }

    /// Clears all recorded usage.
    pub fn clear(&self) {
        self.guard().clear();
    }

    /// Returns the total number of records.
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    /// Returns true if no records exist.
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

#[async_trait]
impl UsageTracker for InMemoryUsageTracker {
    async fn record_usage(&self, record: UsageRecord) -> Result<(), UsageTrackerError> {
        self.guard().push(record);
        Ok(())
    }

    async fn get_summary(&self) -> Result<UsageSummary, UsageTrackerError> {
        Ok(UsageSummary::from_records(self.guard().iter()))
    }

    async fn get_request_summary(&self, request_id: &str) -> Result<UsageSummary, UsageTrackerError> {
        let records = self.guard();
        Ok(UsageSummary::from_records(
            records.iter().filter(|r| r.request_id == request_id),
        ))
    }
}

impl AIEventCallback for InMemoryUsageTracker {
    fn on_tokens_used(&self, event: events::ModelTokensUsed) {
        let mut record = UsageRecord::new(
            event.request_id,
            event.stage,
            event.model,
            event.prompt_tokens,
            event.completion_tokens,
            event.estimated_cost_cents,
        );
        record.occurred_at = event.occurred_at;
        self.guard().push(record);
    }

    fn on_fallback(&self, _event: events::ModelFallback) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::workflow::Stage;

    fn record(request_id: &str, model: &str, prompt: u32, completion: u32, cost: u32) -> UsageRecord {
        UsageRecord::new(request_id, Some(Stage::GatheringRequirements), model, prompt, completion, cost)
    }

    #[tokio::test]
    async fn records_and_retrieves_usage() {
        let tracker = InMemoryUsageTracker::new();

        tracker.record_usage(record("req-1", "gpt-4o", 100, 50, 15)).await.unwrap();

        assert_eq!(tracker.len(), 1);
        let records = tracker.records();
        assert_eq!(records[0].model, "gpt-4o");
        assert_eq!(records[0].cost_cents, 15);
    }

    #[tokio::test]
    async fn summarizes_all_records() {
        let tracker = InMemoryUsageTracker::new();
        tracker.record_usage(record("req-1", "gpt-4o", 100, 50, 15)).await.unwrap();
        tracker.record_usage(record("req-2", "gpt-4o-mini", 200, 100, 3)).await.unwrap();

        let summary = tracker.get_summary().await.unwrap();

        assert_eq!(summary.request_count, 2);
        assert_eq!(summary.total_tokens, 450);
        assert_eq!(summary.total_cost_cents, 18);
        assert_eq!(summary.by_model.len(), 2);
    }

    #[tokio::test]
    async fn summarizes_one_request() {
        let tracker = InMemoryUsageTracker::new();
        tracker.record_usage(record("req-1", "gpt-4o", 100, 50, 15)).await.unwrap();
        tracker.record_usage(record("req-1", "gpt-4o", 10, 5, 1)).await.unwrap();
        tracker.record_usage(record("req-2", "gpt-4o", 200, 100, 30)).await.unwrap();

        let summary = tracker.get_request_summary("req-1").await.unwrap();

        assert_eq!(summary.request_count, 2);
        assert_eq!(summary.total_tokens, 165);
        assert_eq!(summary.total_cost_cents, 16);
    }

    #[tokio::test]
    async fn unknown_request_has_empty_summary() {
        let tracker = InMemoryUsageTracker::new();
        let summary = tracker.get_request_summary("missing").await.unwrap();
        assert_eq!(summary, UsageSummary::default());
    }

    #[test]
    fn records_tokens_used_events() {
        let tracker = InMemoryUsageTracker::new();
        let occurred_at = Timestamp::now();

        tracker.on_tokens_used(events::ModelTokensUsed {
            request_id: "req-9".into(),
            stage: Some(Stage::CodeGeneration),
            model: "gpt-4o".into(),
            prompt_tokens: 40,
            completion_tokens: 60,
            estimated_cost_cents: 2,
            attempt: 1,
            occurred_at,
        });

        let records = tracker.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request_id, "req-9");
        assert_eq!(records[0].stage, Some(Stage::CodeGeneration));
        assert_eq!(records[0].total_tokens(), 100);
        assert_eq!(records[0].occurred_at, occurred_at);
    }

    #[test]
    fn clear_removes_all_records() {
        let tracker = InMemoryUsageTracker::new();
        tracker.on_fallback(events::ModelFallback::new(
            "req-1",
            "a",
            "b",
            crate::ports::FailureKind::RateLimited,
            "429",
        ));
        assert!(tracker.is_empty());

        tracker.on_tokens_used(events::ModelTokensUsed {
            request_id: "req-1".into(),
            stage: None,
            model: "a".into(),
            prompt_tokens: 1,
            completion_tokens: 1,
            estimated_cost_cents: 0,
            attempt: 2,
            occurred_at: Timestamp::now(),
        });
        assert_eq!(tracker.len(), 1);

        tracker.clear();
        assert!(tracker.is_empty());
    }
}
