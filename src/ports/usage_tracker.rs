//! UsageTracker port - Interface for tracking language model usage and costs.
//!
//! Every successful model attempt is recorded, tagged with the interaction's
//! request id and stage. Usage is monitoring only; nothing in the workflow
//! reads it back to make decisions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::Timestamp;
use crate::domain::workflow::Stage;

/// Record of usage for a single model attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Interaction the attempt belongs to.
    pub request_id: String,
    /// Stage the interaction ran in.
    pub stage: Option<Stage>,
    /// Model used.
    pub model: String,
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Cost in cents.
    pub cost_cents: u32,
    /// When the usage occurred.
    pub occurred_at: Timestamp,
}

impl UsageRecord {
    /// Creates a new usage record stamped now.
    pub fn new(
        request_id: impl Into<String>,
        stage: Option<Stage>,
        model: impl Into<String>,
        prompt_tokens: u32,
        completion_tokens: u32,
        cost_cents: u32,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            stage,
            model: model.into(),
            prompt_tokens,
            completion_tokens,
            cost_cents,
            occurred_at: Timestamp::now(),
        }
    }

    /// Total tokens used.
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Aggregated usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Total cost in cents.
    pub total_cost_cents: u32,
    /// Total tokens used.
    pub total_tokens: u32,
    /// Number of recorded attempts.
    pub request_count: u32,
    /// Breakdown by model, sorted by model name.
    pub by_model: Vec<ModelUsage>,
}

impl UsageSummary {
    /// Aggregates a set of records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a UsageRecord>) -> Self {
        let mut summary = UsageSummary::default();
        let mut by_model: BTreeMap<&str, ModelUsage> = BTreeMap::new();

        for record in records {
            summary.total_cost_cents += record.cost_cents;
            summary.total_tokens += record.total_tokens();
            summary.request_count += 1;

            let entry = by_model
                .entry(record.model.as_str())
                .or_insert_with(|| ModelUsage {
                    model: record.model.clone(),
                    ..ModelUsage::default()
                });
            entry.cost_cents += record.cost_cents;
            entry.tokens += record.total_tokens();
            entry.requests += 1;
        }

        summary.by_model = by_model.into_values().collect();
        summary
    }
}

/// Usage breakdown for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Model name.
    pub model: String,
    /// Cost in cents for this model.
    pub cost_cents: u32,
    /// Tokens used with this model.
    pub tokens: u32,
    /// Number of attempts served by this model.
    pub requests: u32,
}

/// Port for tracking model usage and costs.
#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Records a usage event.
    async fn record_usage(&self, record: UsageRecord) -> Result<(), UsageTrackerError>;

    /// Totals across every recorded attempt.
    async fn get_summary(&self) -> Result<UsageSummary, UsageTrackerError>;

    /// Totals for one interaction.
    async fn get_request_summary(&self, request_id: &str) -> Result<UsageSummary, UsageTrackerError>;
}

/// Errors from the usage tracker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageTrackerError {
    /// Backing store failed.
    #[error("usage store error: {0}")]
    Storage(String),
}
