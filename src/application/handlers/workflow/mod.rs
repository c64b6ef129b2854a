//! Workflow handlers - the caller-facing interaction operation.

mod contract_enforcer;
mod errors;
mod process_interaction;

pub use contract_enforcer::{ContractEnforcer, EnforcedContract, DEFAULT_MAX_CORRECTIONS};
pub use errors::{InteractionFailure, WorkflowError};
pub use process_interaction::{
    GenerationParams, StageGeneration, WorkflowOrchestrator, WorkflowSettings,
};
