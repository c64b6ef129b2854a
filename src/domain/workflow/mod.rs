//! Workflow module - the context-centric copilot engine's domain.
//!
//! Everything here is pure: prompt assembly, contract validation,
//! context merging and stage decisions. Model calls live behind ports.

mod context;
mod contract;
mod controller;
mod interaction;
mod merge;
mod origin;
mod prompt;
mod stage;
pub mod templates;

pub use context::{DeviceFacts, ProjectContext, TaggedValue};
pub use contract::{
    extract_json_object, ContractExpectations, ContractParser, ContractViolation, FileFacts,
    LmContract, REQUIRED_FIELDS,
};
pub use controller::{dedupe_options, StageController, StageDecision, DEFAULT_PROGRESS_THRESHOLD};
pub use interaction::{
    ExtractedDocument, FileExtraction, InputLimits, InteractionRequest, InteractionResponse, Mcq,
    StageTransition, UsageReport,
};
pub use merge::{ChangeKind, ContextChange, ContextMerger, MergeOutcome};
pub use origin::Origin;
pub use prompt::{truncate_chars, Prompt, PromptBuilder, TemplateFamily, DEFAULT_FILE_TEXT_CAP};
pub use stage::Stage;
