//! Application layer - Handlers coordinating domain rules and ports.
//!
//! The workflow orchestrator is the single caller-facing operation; the
//! housekeeping handlers manage uploads and report statistics around it.

pub mod handlers;

pub use handlers::{
    // Workflow
    ContractEnforcer, EnforcedContract, GenerationParams, InteractionFailure, StageGeneration,
    WorkflowError, WorkflowOrchestrator, WorkflowSettings, DEFAULT_MAX_CORRECTIONS,
    // Housekeeping
    CleanupSessionsCommand, CleanupSessionsHandler, GetWorkflowStatsQuery, HousekeepingError,
    IngestDocumentCommand, IngestDocumentHandler, SessionStats, WorkflowStats,
    WorkflowStatsHandler,
};
