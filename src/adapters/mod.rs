//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the workflow engine to external systems:
//! - `ai` - Language model providers, the model cascade and usage tracking
//! - `document` - Text extraction for uploaded documents
//! - `storage` - Temporary per-session upload storage

pub mod ai;
pub mod document;
pub mod storage;

pub use ai::{InMemoryUsageTracker, MockLanguageModel, ModelCascade, OpenAIConfig, OpenAIProvider};
pub use document::PlainTextExtractor;
pub use storage::LocalSessionFileStore;
