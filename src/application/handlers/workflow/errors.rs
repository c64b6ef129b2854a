//! Workflow errors and the recoverable failure handed back to callers.

use thiserror::Error;

use crate::domain::foundation::{Progress, ValidationError};
use crate::domain::workflow::{
    ContractViolation, InteractionRequest, InteractionResponse, ProjectContext, Stage,
};
use crate::ports::{FailureKind, GatewayError};

/// Errors raised while processing one interaction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    /// Rejected before any model call.
    #[error("invalid input: {0}")]
    InputInvalid(#[from] ValidationError),

    /// Every corrective re-prompt produced an invalid response.
    #[error("model response violated the contract after {attempts} attempts: {violation}")]
    ContractParseFailure {
        attempts: u32,
        violation: ContractViolation,
    },

    /// No candidate model could serve the call.
    #[error("language model backend unavailable ({failure_kind:?}): {detail}")]
    BackendExhausted {
        failure_kind: FailureKind,
        attempts: u32,
        detail: String,
    },

    /// The caller-set deadline passed.
    #[error("interaction timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Internal invariant broken; not recoverable.
    #[error("internal error: {0}")]
    ProgrammingError(String),
}

impl WorkflowError {
    pub fn contract_failure(attempts: u32, violation: ContractViolation) -> Self {
        WorkflowError::ContractParseFailure {
            attempts,
            violation,
        }
    }

    pub fn programming(message: impl Into<String>) -> Self {
        WorkflowError::ProgrammingError(message.into())
    }

    /// Returns true if the caller can retry or fall back.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, WorkflowError::ProgrammingError(_))
    }

    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::InputInvalid(err) => format!(
                "I couldn't process that request: {}. Please adjust your input and try again.",
                err
            ),
            WorkflowError::ContractParseFailure { .. } => {
                "I apologize, but I couldn't complete a valid response this time. Please try again."
                    .to_string()
            }
            WorkflowError::BackendExhausted { .. } => {
                "I apologize, but I couldn't complete your request because the assistant is temporarily unavailable. Please try again in a moment."
                    .to_string()
            }
            WorkflowError::Timeout { .. } => {
                "I apologize, but I couldn't complete your request in time. Please try again."
                    .to_string()
            }
            WorkflowError::ProgrammingError(_) => {
                "An internal error occurred. Please report this issue.".to_string()
            }
        }
    }
}

impl From<GatewayError> for WorkflowError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoCandidates => {
                WorkflowError::programming("completion gateway has no candidate models")
            }
            other => WorkflowError::BackendExhausted {
                failure_kind: other.failure_kind(),
                attempts: other.attempts(),
                detail: other.to_string(),
            },
        }
    }
}

/// A failed interaction, carrying everything needed to answer the caller
/// without losing state.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionFailure {
    pub error: WorkflowError,
    /// The caller's context, unmodified.
    pub previous_context: ProjectContext,
    pub stage: Stage,
    pub previous_progress: Option<Progress>,
    pub message: String,
}

impl InteractionFailure {
    /// Wraps an error with the request state it must preserve.
    pub fn new(error: WorkflowError, request: &InteractionRequest) -> Self {
        let message = error.user_message();
        Self {
            previous_context: request.current_context.clone(),
            stage: request.current_stage,
            previous_progress: request.previous_progress().ok().flatten(),
            message,
            error,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.error.is_recoverable()
    }

    /// Builds a response that leaves context, stage and progress unchanged.
    pub fn into_fallback_response(self) -> InteractionResponse {
        let progress = if self.stage == Stage::GatheringRequirements {
            Some(self.previous_progress.unwrap_or(Progress::ZERO))
        } else {
            None
        };

        InteractionResponse {
            updated_context: self.previous_context,
            chat_message: self.message,
            current_stage: self.stage,
            gathering_requirements_estimated_progress: progress,
            mcq: None,
            generated_code: None,
            file_extractions: Vec::new(),
            context_changes: Vec::new(),
            usage: None,
        }
    }
}

impl std::fmt::Display for InteractionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for InteractionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::AIError;

    fn request() -> InteractionRequest {
        InteractionRequest::new(
            ProjectContext::new().with_information("Tank with two pumps"),
            Stage::GatheringRequirements,
        )
        .with_message("add a level switch")
        .with_previous_progress(0.4)
    }

    mod gateway_mapping {
        use super::*;

        #[test]
        fn exhausted_becomes_backend_exhausted() {
            let err: WorkflowError = GatewayError::Exhausted {
                candidates: 2,
                attempts: 2,
                last_error: AIError::rate_limited(30),
            }
            .into();

            match err {
                WorkflowError::BackendExhausted {
                    failure_kind,
                    attempts,
                    ..
                } => {
                    assert_eq!(failure_kind, FailureKind::RateLimited);
                    assert_eq!(attempts, 2);
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[test]
        fn fatal_becomes_backend_exhausted() {
            let err: WorkflowError = GatewayError::Fatal {
                model: "gpt-4o".into(),
                attempts: 3,
                error: AIError::network("reset"),
            }
            .into();

            assert!(matches!(err, WorkflowError::BackendExhausted { .. }));
            assert!(err.is_recoverable());
        }

        #[test]
        fn no_candidates_is_a_programming_error() {
            let err: WorkflowError = GatewayError::NoCandidates.into();
            assert!(matches!(err, WorkflowError::ProgrammingError(_)));
            assert!(!err.is_recoverable());
        }
    }

    mod fallback {
        use super::*;

        #[test]
        fn keeps_context_stage_and_progress() {
            let req = request();
            let failure = InteractionFailure::new(WorkflowError::Timeout { secs: 30 }, &req);

            let response = failure.into_fallback_response();

            assert_eq!(response.updated_context, req.current_context);
            assert_eq!(response.current_stage, Stage::GatheringRequirements);
            assert_eq!(
                response.gathering_requirements_estimated_progress,
                Some(Progress::try_new(0.4).unwrap())
            );
            assert!(response.chat_message.starts_with("I apologize"));
            assert!(response.mcq.is_none());
            assert!(response.context_changes.is_empty());
        }

        #[test]
        fn omits_progress_outside_gathering() {
            let req = InteractionRequest::new(ProjectContext::new(), Stage::RefinementTesting)
                .with_message("rename the timer");
            let failure = InteractionFailure::new(
                WorkflowError::contract_failure(3, ContractViolation::NoJson),
                &req,
            );

            let response = failure.into_fallback_response();

            assert_eq!(response.current_stage, Stage::RefinementTesting);
            assert!(response.gathering_requirements_estimated_progress.is_none());
        }

        #[test]
        fn invalid_input_message_names_the_problem() {
            let err = WorkflowError::from(ValidationError::empty_field("mcq_responses"));
            assert!(err.user_message().contains("mcq_responses"));
            assert!(err.is_recoverable());
        }
    }
}
