//! Errors raised by housekeeping handlers.

use thiserror::Error;

use crate::ports::{ExtractionError, StorageError, UsageTrackerError};

/// Housekeeping failures. None of these affect workflow state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HousekeepingError {
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("usage tracking failed: {0}")]
    Usage(#[from] UsageTrackerError),

    #[error("text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}
