//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the workflow engine and the outside world. Adapters implement these ports.
//!
//! ## Model Ports
//!
//! - `LanguageModel` - One model backend, one attempt per call
//! - `CompletionGateway` - One logical call across an ordered model cascade
//! - `UsageTracker` - Token and cost accounting per attempt
//!
//! ## Housekeeping Ports
//!
//! - `TextExtractor` - Uploaded bytes to prompt-ready text
//! - `SessionFileStore` - Temporary per-session upload storage

mod completion_gateway;
mod language_model;
mod session_file_store;
mod text_extractor;
mod usage_tracker;

pub use completion_gateway::{CompletionGateway, GatewayError, GatewayReply};
pub use language_model::{
    AIError, CompletionRequest, CompletionResponse, FailureKind, FinishReason, LanguageModel,
    Message, MessageRole, ProviderInfo, RequestMetadata, ResponseFormat, TokenLimitParam,
    TokenUsage,
};
pub use session_file_store::{
    CleanupReport, SessionFileStore, SessionSummary, StorageError, StoredFile,
};
pub use text_extractor::{ExtractionError, TextExtractor};
pub use usage_tracker::{ModelUsage, UsageRecord, UsageSummary, UsageTracker, UsageTrackerError};
