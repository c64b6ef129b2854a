//! WorkflowOrchestrator - Runs one copilot interaction end to end.
//!
//! validate → resolve stage → build prompt → obtain contract → merge → advance.
//!
//! The orchestrator holds no session state: everything it needs arrives in
//! the [`InteractionRequest`] and everything the caller must keep leaves in
//! the [`InteractionResponse`]. Any failure hands back the caller's context
//! untouched.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::domain::workflow::{
    ContextMerger, ContractExpectations, FileExtraction, InputLimits, InteractionRequest,
    InteractionResponse, PromptBuilder, Stage, StageController, DEFAULT_FILE_TEXT_CAP,
    DEFAULT_PROGRESS_THRESHOLD,
};
use crate::ports::{CompletionGateway, CompletionRequest, MessageRole, RequestMetadata};

use super::{ContractEnforcer, InteractionFailure, WorkflowError, DEFAULT_MAX_CORRECTIONS};

/// Sampling parameters for one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

/// Per-stage sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageGeneration {
    pub gathering: GenerationParams,
    pub code_generation: GenerationParams,
    pub refinement: GenerationParams,
}

impl StageGeneration {
    pub fn for_stage(&self, stage: Stage) -> GenerationParams {
        match stage {
            Stage::GatheringRequirements => self.gathering,
            Stage::CodeGeneration => self.code_generation,
            Stage::RefinementTesting => self.refinement,
        }
    }
}

impl Default for StageGeneration {
    fn default() -> Self {
        Self {
            gathering: GenerationParams::new(1024, 0.7),
            code_generation: GenerationParams::new(2048, 0.3),
            refinement: GenerationParams::new(1536, 0.7),
        }
    }
}

/// Tunables for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub progress_threshold: f64,
    pub max_corrections: u32,
    pub interaction_timeout: Duration,
    pub input_limits: InputLimits,
    pub file_text_cap: usize,
    pub generation: StageGeneration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            progress_threshold: DEFAULT_PROGRESS_THRESHOLD,
            max_corrections: DEFAULT_MAX_CORRECTIONS,
            interaction_timeout: Duration::from_secs(120),
            input_limits: InputLimits::default(),
            file_text_cap: DEFAULT_FILE_TEXT_CAP,
            generation: StageGeneration::default(),
        }
    }
}

/// Handler for the single caller-facing operation.
pub struct WorkflowOrchestrator {
    enforcer: ContractEnforcer,
    prompts: PromptBuilder,
    merger: ContextMerger,
    controller: StageController,
    settings: WorkflowSettings,
}

impl WorkflowOrchestrator {
    pub fn new(gateway: Arc<dyn CompletionGateway>, settings: WorkflowSettings) -> Self {
        Self {
            enforcer: ContractEnforcer::new(gateway).with_max_corrections(settings.max_corrections),
            prompts: PromptBuilder::new(settings.file_text_cap),
            merger: ContextMerger::new(),
            controller: StageController::new(settings.progress_threshold),
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Processes one interaction under the configured timeout.
    pub async fn process_interaction(
        &self,
        request: InteractionRequest,
    ) -> Result<InteractionResponse, InteractionFailure> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "process_interaction",
            request_id = %request_id,
            stage = %request.current_stage,
            documents = request.documents.len(),
        );

        async {
            let deadline = self.settings.interaction_timeout;
            let outcome = match tokio::time::timeout(deadline, self.run(&request, &request_id)).await {
                Ok(result) => result,
                Err(_) => Err(WorkflowError::Timeout {
                    secs: deadline.as_secs(),
                }),
            };

            outcome.map_err(|error| {
                if error.is_recoverable() {
                    tracing::warn!(error = %error, "Interaction failed; previous context preserved");
                } else {
                    tracing::error!(error = %error, "Interaction failed with internal error");
                }
                InteractionFailure::new(error, &request)
            })
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &InteractionRequest,
        request_id: &str,
    ) -> Result<InteractionResponse, WorkflowError> {
        // 1. Reject malformed input before spending tokens
        request.validate(&self.settings.input_limits)?;
        let previous_progress = request.previous_progress()?;
        let stage = self.controller.resolve_entry_stage(request)?;

        // 2. Assemble the prompt
        let prompt = self.prompts.build(request, stage);
        tracing::info!(family = ?prompt.family, stage = %stage, "Prompt template selected");

        let params = self.settings.generation.for_stage(stage);
        let completion = CompletionRequest::new(RequestMetadata::new(request_id).with_stage(stage))
            .with_system_prompt(prompt.system)
            .with_message(MessageRole::User, prompt.user)
            .with_max_tokens(params.max_tokens)
            .with_temperature(params.temperature)
            .with_json_response();

        // 3. Obtain a valid contract
        let expectations = ContractExpectations {
            stage,
            has_user_input: request.has_user_input(),
            known_documents: request.documents.iter().map(|d| d.id.clone()).collect(),
            prior_information_len: request.current_context.information_len(),
        };
        let enforced = self.enforcer.obtain(completion, &expectations).await?;
        let contract = enforced.contract;

        // 4. Merge facts and decide stage
        let merge = self.merger.merge_contract(&request.current_context, &contract);
        let decision = self.controller.advance(stage, previous_progress, &contract);

        tracing::info!(
            from = %request.current_stage,
            to = %decision.stage,
            progress = ?decision.progress.map(|p| p.value()),
            changes = merge.changes.len(),
            corrections = enforced.corrections,
            model = %enforced.usage.model,
            "Interaction complete"
        );

        let file_extractions = contract
            .file_facts
            .into_iter()
            .map(|facts| FileExtraction {
                document_id: facts.document_id,
                summary: facts.summary,
            })
            .collect();

        Ok(InteractionResponse {
            updated_context: merge.context,
            chat_message: contract.chat_message,
            current_stage: decision.stage,
            gathering_requirements_estimated_progress: decision.progress,
            mcq: decision.mcq,
            generated_code: decision.generated_code,
            file_extractions,
            context_changes: merge.changes,
            usage: Some(enforced.usage),
        })
    }
}
