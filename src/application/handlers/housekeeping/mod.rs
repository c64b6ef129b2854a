//! Housekeeping handlers around the workflow engine: uploads, cleanup, stats.

mod cleanup_sessions;
mod errors;
mod ingest_document;
mod workflow_stats;

pub use cleanup_sessions::{CleanupSessionsCommand, CleanupSessionsHandler};
pub use errors::HousekeepingError;
pub use ingest_document::{IngestDocumentCommand, IngestDocumentHandler};
pub use workflow_stats::{GetWorkflowStatsQuery, SessionStats, WorkflowStats, WorkflowStatsHandler};
