//! Language Model Adapters.
//!
//! Implementations of the LanguageModel and CompletionGateway ports.
//!
//! ## Available Adapters
//!
//! - `MockLanguageModel` - Configurable mock for testing
//! - `OpenAIProvider` - OpenAI chat completions, one attempt per call
//! - `ModelCascade` - Ordered fallback across candidates (the gateway)
//! - `InMemoryUsageTracker` - Usage accounting, also usable as a cascade callback

mod in_memory_usage_tracker;
mod mock_provider;
mod model_cascade;
mod openai_provider;

pub use in_memory_usage_tracker::InMemoryUsageTracker;
pub use mock_provider::{MockError, MockLanguageModel, MockResponse};
pub use model_cascade::{
    events as ai_events, AIEventCallback, CompositeEventCallback, ModelCascade, NoOpEventCallback,
    TracingEventCallback, DEFAULT_BACKOFF_BASE, DEFAULT_MAX_TRANSIENT_RETRIES,
};
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
