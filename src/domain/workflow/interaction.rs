//! Per-call input and output of the workflow engine.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::{DocumentId, Progress, ValidationError};

use super::{ContextChange, ProjectContext, Stage};

/// Output of the text extraction adapter for one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub id: DocumentId,
    /// Original file name, for display in prompts.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub raw_text: String,
    /// Pre-parsed specification summary, preferred over raw text when present.
    #[serde(default)]
    pub structured_summary: Option<String>,
}

impl ExtractedDocument {
    /// Creates a document payload from raw text only.
    pub fn new(id: DocumentId, name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            raw_text: raw_text.into(),
            structured_summary: None,
        }
    }

    /// Attaches a structured summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.structured_summary = Some(summary.into());
        self
    }

    /// True if the document carries no usable text at all.
    pub fn is_blank(&self) -> bool {
        self.raw_text.trim().is_empty()
            && self
                .structured_summary
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
    }
}

/// Caller-requested stage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub target_stage: Stage,
    /// Allows backwards moves and skipping a stage.
    #[serde(default)]
    pub force: bool,
}

impl StageTransition {
    /// A regular, non-forced transition request.
    pub fn to(target_stage: Stage) -> Self {
        Self {
            target_stage,
            force: false,
        }
    }

    /// A forced override.
    pub fn forced(target_stage: Stage) -> Self {
        Self {
            target_stage,
            force: true,
        }
    }
}

/// Limits applied to incoming requests before any model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    pub max_message_chars: usize,
    pub max_documents: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_message_chars: 4000,
            max_documents: 10,
        }
    }
}

/// One interaction's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionRequest {
    #[serde(default)]
    pub message: Option<String>,

    /// Selected answers to the previously posed MCQ.
    #[serde(default)]
    pub mcq_responses: Vec<String>,

    #[serde(default)]
    pub is_multiselect: bool,

    /// Last assistant message, for conversational continuity.
    #[serde(default)]
    pub previous_copilot_message: Option<String>,

    #[serde(default)]
    pub current_context: ProjectContext,

    #[serde(default)]
    pub current_stage: Stage,

    #[serde(default)]
    pub documents: Vec<ExtractedDocument>,

    /// Last progress the caller displayed. `None` resets the estimate.
    #[serde(default)]
    pub previous_progress: Option<f64>,

    #[serde(default)]
    pub transition: Option<StageTransition>,

    /// Code produced by an earlier code generation response.
    #[serde(default)]
    pub current_code: Option<String>,
}

impl InteractionRequest {
    /// Creates a request for the given context and stage.
    pub fn new(current_context: ProjectContext, current_stage: Stage) -> Self {
        Self {
            current_context,
            current_stage,
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_mcq_responses<I, S>(mut self, responses: I, is_multiselect: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mcq_responses = responses.into_iter().map(Into::into).collect();
        self.is_multiselect = is_multiselect;
        self
    }

    pub fn with_previous_message(mut self, message: impl Into<String>) -> Self {
        self.previous_copilot_message = Some(message.into());
        self
    }

    pub fn with_document(mut self, document: ExtractedDocument) -> Self {
        self.documents.push(document);
        self
    }

    pub fn with_previous_progress(mut self, progress: f64) -> Self {
        self.previous_progress = Some(progress);
        self
    }

    pub fn with_transition(mut self, transition: StageTransition) -> Self {
        self.transition = Some(transition);
        self
    }

    pub fn with_current_code(mut self, code: impl Into<String>) -> Self {
        self.current_code = Some(code.into());
        self
    }

    /// Trimmed user text, if any was supplied.
    pub fn user_text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    pub fn has_user_text(&self) -> bool {
        self.user_text().is_some()
    }

    pub fn has_files(&self) -> bool {
        !self.documents.is_empty()
    }

    pub fn has_mcq_answers(&self) -> bool {
        !self.mcq_responses.is_empty()
    }

    /// True if the user said anything this turn, in text or via MCQ.
    pub fn has_user_input(&self) -> bool {
        self.has_user_text() || self.has_mcq_answers()
    }

    /// True if earlier code exists for refinement.
    pub fn has_current_code(&self) -> bool {
        self.current_code
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    /// Validated previous progress, if supplied.
    pub fn previous_progress(&self) -> Result<Option<Progress>, ValidationError> {
        self.previous_progress
            .map(|p| {
                Progress::try_new(p).map_err(|_| {
                    ValidationError::out_of_range("previous_progress", 0.0, 1.0, p)
                })
            })
            .transpose()
    }

    /// Checks request shape before any model call.
    pub fn validate(&self, limits: &InputLimits) -> Result<(), ValidationError> {
        if let Some(message) = &self.message {
            let len = message.chars().count();
            if len > limits.max_message_chars {
                return Err(ValidationError::too_long(
                    "message",
                    limits.max_message_chars,
                    len,
                ));
            }
        }

        let mut seen_answers = HashSet::new();
        for answer in &self.mcq_responses {
            if answer.trim().is_empty() {
                return Err(ValidationError::empty_field("mcq_responses"));
            }
            if !seen_answers.insert(answer.trim()) {
                return Err(ValidationError::duplicate("mcq_responses", answer.trim()));
            }
        }
        if self.mcq_responses.len() > 1 && !self.is_multiselect {
            return Err(ValidationError::invalid_format(
                "mcq_responses",
                "multiple answers given for a single-select question",
            ));
        }

        if self.documents.len() > limits.max_documents {
            return Err(ValidationError::invalid_format(
                "documents",
                format!("at most {} documents per interaction", limits.max_documents),
            ));
        }
        let mut seen_docs = HashSet::new();
        for doc in &self.documents {
            if !seen_docs.insert(&doc.id) {
                return Err(ValidationError::duplicate("documents", doc.id.as_str()));
            }
            if doc.is_blank() {
                return Err(ValidationError::empty_field(format!(
                    "documents[{}].raw_text",
                    doc.id
                )));
            }
        }

        self.previous_progress()?;
        Ok(())
    }
}

/// A single structured multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mcq {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub is_multiselect: bool,
}

/// Per-document summary of what the model took from an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExtraction {
    pub document_id: DocumentId,
    pub summary: String,
}

/// Aggregate model usage across every attempt of one interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    /// Model that produced the accepted response.
    pub model: String,
    /// Model calls made, including corrective re-prompts.
    pub calls: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub estimated_cost_cents: u32,
}

impl UsageReport {
    /// Total tokens across all calls.
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// One interaction's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    pub updated_context: ProjectContext,
    pub chat_message: String,
    pub current_stage: Stage,

    /// Only reported while gathering requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gathering_requirements_estimated_progress: Option<Progress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcq: Option<Mcq>,

    /// Only present when the call ran in code generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_code: Option<String>,

    #[serde(default)]
    pub file_extractions: Vec<FileExtraction>,

    #[serde(default)]
    pub context_changes: Vec<ContextChange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageReport>,
}

impl InteractionResponse {
    /// True if the response poses a structured question.
    pub fn is_mcq(&self) -> bool {
        self.mcq.is_some()
    }
}
