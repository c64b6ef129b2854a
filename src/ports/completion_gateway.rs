//! Completion Gateway Port - One logical model call across a model cascade.
//!
//! The workflow engine never talks to a [`LanguageModel`] directly. It asks a
//! gateway for one completion, and the gateway decides which candidate
//! serves it, how failures are retried, and when the call is lost.
//!
//! [`LanguageModel`]: super::LanguageModel

use async_trait::async_trait;
use thiserror::Error;

use super::{AIError, CompletionRequest, FailureKind, TokenUsage};

/// Port for a single logical completion.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Completes the request on the first candidate able to serve it.
    async fn complete(&self, request: CompletionRequest) -> Result<GatewayReply, GatewayError>;

    /// Candidate model names in priority order.
    fn candidates(&self) -> Vec<String>;
}

/// Successful gateway result.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    /// Raw model text, not yet validated.
    pub text: String,
    /// Usage of the successful attempt.
    pub usage: TokenUsage,
    /// Model that produced the text.
    pub model: String,
    /// Attempts made across all candidates, including the successful one.
    pub attempts: u32,
}

/// Terminal gateway failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Every candidate was rate limited or rejected the request shape.
    #[error("all {candidates} candidate models failed after {attempts} attempts: {last_error}")]
    Exhausted {
        candidates: usize,
        attempts: u32,
        last_error: AIError,
    },

    /// A candidate failed in a way that ends the call.
    #[error("model {model} failed after {attempts} attempts: {error}")]
    Fatal {
        model: String,
        attempts: u32,
        error: AIError,
    },

    /// The cascade is empty.
    #[error("no candidate models configured")]
    NoCandidates,
}

impl GatewayError {
    /// Classification of the failure that ended the call.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            GatewayError::Exhausted { last_error, .. } => last_error.failure_kind(),
            GatewayError::Fatal { .. } | GatewayError::NoCandidates => FailureKind::Fatal,
        }
    }

    /// Attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            GatewayError::Exhausted { attempts, .. } | GatewayError::Fatal { attempts, .. } => {
                *attempts
            }
            GatewayError::NoCandidates => 0,
        }
    }
}
