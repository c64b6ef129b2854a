//! Workflow engine configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::workflow::{InputLimits, DEFAULT_FILE_TEXT_CAP, DEFAULT_PROGRESS_THRESHOLD};

/// Workflow engine configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    /// Progress at which gathering hands over to code generation
    #[serde(default = "default_progress_threshold")]
    pub progress_threshold: f64,

    /// Corrective re-prompts allowed per interaction
    #[serde(default = "default_max_corrections")]
    pub max_corrections: u32,

    /// Deadline for one whole interaction in seconds
    #[serde(default = "default_interaction_timeout")]
    pub interaction_timeout_secs: u64,

    /// Longest accepted user message, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Documents accepted per interaction
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,

    /// Raw document text embedded in a prompt, in characters
    #[serde(default = "default_file_text_cap")]
    pub file_text_cap: usize,
}

impl WorkflowConfig {
    /// Get interaction timeout as Duration
    pub fn interaction_timeout(&self) -> Duration {
        Duration::from_secs(self.interaction_timeout_secs)
    }

    pub fn input_limits(&self) -> InputLimits {
        InputLimits {
            max_message_chars: self.max_message_chars,
            max_documents: self.max_documents,
        }
    }

    /// Validate workflow configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.progress_threshold > 0.0 && self.progress_threshold <= 1.0) {
            return Err(ValidationError::InvalidProgressThreshold);
        }
        if self.interaction_timeout_secs == 0 || self.interaction_timeout_secs > 600 {
            return Err(ValidationError::InvalidInteractionTimeout);
        }
        if self.max_message_chars == 0 {
            return Err(ValidationError::MustBePositive("max_message_chars"));
        }
        if self.file_text_cap == 0 {
            return Err(ValidationError::MustBePositive("file_text_cap"));
        }
        Ok(())
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            progress_threshold: default_progress_threshold(),
            max_corrections: default_max_corrections(),
            interaction_timeout_secs: default_interaction_timeout(),
            max_message_chars: default_max_message_chars(),
            max_documents: default_max_documents(),
            file_text_cap: default_file_text_cap(),
        }
    }
}

fn default_progress_threshold() -> f64 {
    DEFAULT_PROGRESS_THRESHOLD
}

fn default_max_corrections() -> u32 {
    2
}

fn default_interaction_timeout() -> u64 {
    120
}

fn default_max_message_chars() -> usize {
    InputLimits::default().max_message_chars
}

fn default_max_documents() -> usize {
    InputLimits::default().max_documents
}

fn default_file_text_cap() -> usize {
    DEFAULT_FILE_TEXT_CAP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.progress_threshold, 0.8);
        assert_eq!(config.max_corrections, 2);
        assert_eq!(config.interaction_timeout(), Duration::from_secs(120));
        assert_eq!(config.input_limits(), InputLimits::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_bounds() {
        for threshold in [0.0, -0.1, 1.5] {
            let config = WorkflowConfig {
                progress_threshold: threshold,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ValidationError::InvalidProgressThreshold));
        }
        let config = WorkflowConfig {
            progress_threshold: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = WorkflowConfig {
            interaction_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidInteractionTimeout));
    }

    #[test]
    fn test_zero_corrections_allowed() {
        let config = WorkflowConfig {
            max_corrections: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
