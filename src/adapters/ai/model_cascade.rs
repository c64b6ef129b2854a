//! Model Cascade - Ordered fallback across language model candidates.
//!
//! Implements the `CompletionGateway` port over an explicit, ordered list of
//! `LanguageModel` candidates. Each failure is classified and handled:
//!
//! | Failure              | Reaction                                           |
//! |----------------------|----------------------------------------------------|
//! | rate limited         | move to the next candidate                         |
//! | parameter rejected   | reshape the request, retry same candidate once     |
//! | transient            | retry with exponential backoff, then fatal         |
//! | fatal                | stop                                               |
//!
//! # Example
//!
//! ```ignore
//! let cascade = ModelCascade::new(vec![
//!     Arc::new(OpenAIProvider::new(config.for_model("gpt-4o"))?),
//!     Arc::new(OpenAIProvider::new(config.for_model("gpt-4o-mini"))?),
//! ])
//! .with_max_transient_retries(2)
//! .with_event_callback(Arc::new(TracingEventCallback));
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    AIError, CompletionGateway, CompletionRequest, CompletionResponse, FailureKind,
    GatewayError, GatewayReply, LanguageModel, ResponseFormat, TokenLimitParam,
};

/// Default bound on transient retries per candidate.
pub const DEFAULT_MAX_TRANSIENT_RETRIES: u32 = 2;

/// Default base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Model events for cost tracking and fallback monitoring.
pub mod events {
    use serde::{Deserialize, Serialize};

    use crate::domain::foundation::Timestamp;
    use crate::domain::workflow::Stage;
    use crate::ports::FailureKind;

    /// Emitted once per successful attempt.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ModelTokensUsed {
        pub request_id: String,
        pub stage: Option<Stage>,
        pub model: String,
        pub prompt_tokens: u32,
        pub completion_tokens: u32,
        pub estimated_cost_cents: u32,
        /// Attempt number within the logical call, starting at 1.
        pub attempt: u32,
        pub occurred_at: Timestamp,
    }

    impl ModelTokensUsed {
        /// Total tokens used in this attempt.
        pub fn total_tokens(&self) -> u32 {
            self.prompt_tokens + self.completion_tokens
        }
    }

    /// Emitted once per step down the cascade.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ModelFallback {
        pub request_id: String,
        pub from_model: String,
        pub to_model: String,
        pub failure_kind: FailureKind,
        pub reason: String,
        pub occurred_at: Timestamp,
    }

    impl ModelFallback {
        /// Creates a new fallback event stamped now.
        pub fn new(
            request_id: impl Into<String>,
            from_model: impl Into<String>,
            to_model: impl Into<String>,
            failure_kind: FailureKind,
            reason: impl Into<String>,
        ) -> Self {
            Self {
                request_id: request_id.into(),
                from_model: from_model.into(),
                to_model: to_model.into(),
                failure_kind,
                reason: reason.into(),
                occurred_at: Timestamp::now(),
            }
        }
    }
}

/// Callback for receiving model events (tokens used, fallback).
pub trait AIEventCallback: Send + Sync {
    /// Called when an attempt succeeds.
    fn on_tokens_used(&self, event: events::ModelTokensUsed);

    /// Called when the cascade moves to the next candidate.
    fn on_fallback(&self, event: events::ModelFallback);
}

/// No-op event callback for when event tracking isn't needed.
#[derive(Debug, Clone, Copy)]
pub struct NoOpEventCallback;

impl AIEventCallback for NoOpEventCallback {
    fn on_tokens_used(&self, _event: events::ModelTokensUsed) {}
    fn on_fallback(&self, _event: events::ModelFallback) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy)]
pub struct TracingEventCallback;

impl AIEventCallback for TracingEventCallback {
    fn on_tokens_used(&self, event: events::ModelTokensUsed) {
        tracing::info!(
            request_id = %event.request_id,
            model = %event.model,
            attempt = event.attempt,
            prompt_tokens = event.prompt_tokens,
            completion_tokens = event.completion_tokens,
            cost_cents = event.estimated_cost_cents,
            "Model tokens used"
        );
    }

    fn on_fallback(&self, event: events::ModelFallback) {
        tracing::warn!(
            request_id = %event.request_id,
            from = %event.from_model,
            to = %event.to_model,
            kind = ?event.failure_kind,
            reason = %event.reason,
            "Falling back to next model"
        );
    }
}

/// Forwards every event to several callbacks in order.
#[derive(Clone, Default)]
pub struct CompositeEventCallback {
    callbacks: Vec<Arc<dyn AIEventCallback>>,
}

impl CompositeEventCallback {
    /// Creates an empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback.
    pub fn with(mut self, callback: Arc<dyn AIEventCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }
}

impl AIEventCallback for CompositeEventCallback {
    fn on_tokens_used(&self, event: events::ModelTokensUsed) {
        for callback in &self.callbacks {
            callback.on_tokens_used(event.clone());
        }
    }

    fn on_fallback(&self, event: events::ModelFallback) {
        for callback in &self.callbacks {
            callback.on_fallback(event.clone());
        }
    }
}

/// Ordered cascade of language model candidates.
pub struct ModelCascade {
    candidates: Vec<Arc<dyn LanguageModel>>,
    max_transient_retries: u32,
    backoff_base: Duration,
    event_callback: Arc<dyn AIEventCallback>,
}

impl ModelCascade {
    /// Creates a cascade over the candidates, highest priority first.
    pub fn new(candidates: Vec<Arc<dyn LanguageModel>>) -> Self {
        Self {
            candidates,
            max_transient_retries: DEFAULT_MAX_TRANSIENT_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            event_callback: Arc::new(NoOpEventCallback),
        }
    }

    /// Sets how many times a transient failure is retried per candidate.
    pub fn with_max_transient_retries(mut self, retries: u32) -> Self {
        self.max_transient_retries = retries;
        self
    }

    /// Sets the base delay; retry `n` waits `base * 2^n`.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the event callback for receiving model events.
    pub fn with_event_callback(mut self, callback: Arc<dyn AIEventCallback>) -> Self {
        self.event_callback = callback;
        self
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// True if no candidates are configured.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn backoff(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(retry))
    }

    fn emit_tokens_used(&self, request: &CompletionRequest, response: &CompletionResponse, attempt: u32) {
        self.event_callback.on_tokens_used(events::ModelTokensUsed {
            request_id: request.metadata.request_id.clone(),
            stage: request.metadata.stage,
            model: response.model.clone(),
            prompt_tokens: response.usage.prompt_tokens,
            completion_tokens: response.usage.completion_tokens,
            estimated_cost_cents: response.usage.estimated_cost_cents,
            attempt,
            occurred_at: Timestamp::now(),
        });
    }
}

/// Builds the request a model should accept after rejecting `param`.
///
/// Returns `None` when the rejected parameter cannot be reshaped.
fn reshape(request: &CompletionRequest, param: &str) -> Option<CompletionRequest> {
    let mut reshaped = request.clone();
    if let Some(rejected) = TokenLimitParam::from_field_name(param) {
        reshaped.token_limit_param = rejected.alternate();
        return Some(reshaped);
    }
    match param {
        "temperature" if request.temperature.is_some() => {
            reshaped.temperature = None;
            Some(reshaped)
        }
        "response_format" if request.response_format != ResponseFormat::Text => {
            reshaped.response_format = ResponseFormat::Text;
            Some(reshaped)
        }
        _ => None,
    }
}

#[async_trait]
impl CompletionGateway for ModelCascade {
    async fn complete(&self, request: CompletionRequest) -> Result<GatewayReply, GatewayError> {
        if self.candidates.is_empty() {
            return Err(GatewayError::NoCandidates);
        }

        let request_id = request.metadata.request_id.clone();
        let mut attempts = 0u32;
        let mut last_error: Option<AIError> = None;

        for (index, candidate) in self.candidates.iter().enumerate() {
            let model_name = candidate.provider_info().model;
            let mut current = request.clone();
            let mut reshaped = false;
            let mut transient_retries = 0u32;

            let error = loop {
                attempts += 1;
                tracing::debug!(
                    request_id = %request_id,
                    model = %model_name,
                    attempt = attempts,
                    token_param = current.token_limit_param.field_name(),
                    "Calling model"
                );

                let err = match candidate.complete(current.clone()).await {
                    Ok(response) => {
                        self.emit_tokens_used(&current, &response, attempts);
                        return Ok(GatewayReply {
                            text: response.content,
                            usage: response.usage,
                            model: response.model,
                            attempts,
                        });
                    }
                    Err(err) => err,
                };

                match err.failure_kind() {
                    FailureKind::RateLimited => break err,
                    FailureKind::ParameterRejected => {
                        let next = match &err {
                            AIError::ParameterRejected { param, .. } if !reshaped => {
                                reshape(&current, param)
                            }
                            _ => None,
                        };
                        match next {
                            Some(next) => {
                                tracing::info!(
                                    request_id = %request_id,
                                    model = %model_name,
                                    error = %err,
                                    "Reshaping rejected request"
                                );
                                current = next;
                                reshaped = true;
                            }
                            None => break err,
                        }
                    }
                    FailureKind::Transient if transient_retries < self.max_transient_retries => {
                        let delay = self.backoff(transient_retries);
                        transient_retries += 1;
                        tracing::warn!(
                            request_id = %request_id,
                            model = %model_name,
                            retry = transient_retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Transient model failure, retrying"
                        );
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    FailureKind::Transient | FailureKind::Fatal => {
                        tracing::error!(
                            request_id = %request_id,
                            model = %model_name,
                            attempts,
                            error = %err,
                            "Model call failed"
                        );
                        return Err(GatewayError::Fatal {
                            model: model_name,
                            attempts,
                            error: err,
                        });
                    }
                }
            };

            if let Some(next) = self.candidates.get(index + 1) {
                self.event_callback.on_fallback(events::ModelFallback::new(
                    request_id.clone(),
                    model_name.clone(),
                    next.provider_info().model,
                    error.failure_kind(),
                    error.to_string(),
                ));
            }
            last_error = Some(error);
        }

        match last_error {
            Some(last_error) => {
                tracing::error!(
                    request_id = %request_id,
                    candidates = self.candidates.len(),
                    attempts,
                    "Model cascade exhausted"
                );
                Err(GatewayError::Exhausted {
                    candidates: self.candidates.len(),
                    attempts,
                    last_error,
                })
            }
            None => Err(GatewayError::NoCandidates),
        }
    }

    fn candidates(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|candidate| candidate.provider_info().model)
            .collect()
    }
}
