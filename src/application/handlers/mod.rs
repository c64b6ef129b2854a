//! Command and query handlers.

pub mod housekeeping;
pub mod workflow;

pub use housekeeping::{
    CleanupSessionsCommand, CleanupSessionsHandler, GetWorkflowStatsQuery, HousekeepingError,
    IngestDocumentCommand, IngestDocumentHandler, SessionStats, WorkflowStats,
    WorkflowStatsHandler,
};
pub use workflow::{
    ContractEnforcer, EnforcedContract, GenerationParams, InteractionFailure, StageGeneration,
    WorkflowError, WorkflowOrchestrator, WorkflowSettings, DEFAULT_MAX_CORRECTIONS,
};
