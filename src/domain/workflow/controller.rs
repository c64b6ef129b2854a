//! Stage and progress controller.
//!
//! Decides which stage an interaction runs in, then turns a validated
//! model response into the stage, progress and MCQ the caller sees.

use std::collections::HashSet;

use crate::domain::foundation::{Progress, StateMachine, ValidationError};

use super::{InteractionRequest, LmContract, Mcq, Stage};

/// Default progress at which gathering hands over to code generation.
pub const DEFAULT_PROGRESS_THRESHOLD: f64 = 0.8;

/// Outcome of the controller for one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDecision {
    pub stage: Stage,
    /// Present only for calls made while gathering requirements.
    pub progress: Option<Progress>,
    pub mcq: Option<Mcq>,
    pub generated_code: Option<String>,
}

/// Stage and progress rules.
#[derive(Debug, Clone, Copy)]
pub struct StageController {
    progress_threshold: f64,
}

impl StageController {
    /// Creates a controller with the given gathering → generation threshold.
    pub fn new(progress_threshold: f64) -> Self {
        Self { progress_threshold }
    }

    pub fn progress_threshold(&self) -> f64 {
        self.progress_threshold
    }

    /// Determines the stage the model call runs in.
    ///
    /// An explicit transition request is honoured when it moves one stage
    /// forward or is forced; anything else is rejected. Without a request,
    /// a code generation session that already holds code moves on to
    /// refinement.
    pub fn resolve_entry_stage(&self, request: &InteractionRequest) -> Result<Stage, ValidationError> {
        let current = request.current_stage;

        if let Some(transition) = request.transition {
            let target = transition.target_stage;
            if target == current {
                return Ok(current);
            }
            if current.can_transition_to(&target) {
                tracing::info!(from = %current, to = %target, "Caller advanced stage");
                return Ok(target);
            }
            if transition.force {
                tracing::warn!(from = %current, to = %target, "Forced stage override");
                return Ok(target);
            }
            return Err(ValidationError::invalid_format(
                "transition",
                format!(
                    "cannot move from {} to {} without force",
                    current, target
                ),
            ));
        }

        if current == Stage::CodeGeneration && request.has_current_code() {
            let next = current.transition_to(Stage::RefinementTesting)?;
            tracing::info!(from = %current, to = %next, "Code already generated; entering refinement");
            return Ok(next);
        }

        Ok(current)
    }

    /// Applies progress, MCQ and transition rules to a validated response.
    pub fn advance(
        &self,
        call_stage: Stage,
        previous_progress: Option<Progress>,
        contract: &LmContract,
    ) -> StageDecision {
        let progress = (call_stage == Stage::GatheringRequirements).then(|| {
            let baseline = previous_progress.unwrap_or(Progress::ZERO);
            contract
                .progress
                .map(Progress::clamped)
                .map_or(baseline, |reported| reported.max(baseline))
        });

        let stage = match progress {
            Some(p) if p.reaches(self.progress_threshold) => {
                tracing::info!(progress = p.value(), threshold = self.progress_threshold, "Requirements complete; moving to code generation");
                Stage::CodeGeneration
            }
            _ => call_stage,
        };

        let generated_code = if call_stage == Stage::CodeGeneration {
            contract.generated_code.clone()
        } else {
            None
        };

        StageDecision {
            stage,
            progress,
            mcq: contract.mcq.as_ref().and_then(normalize_mcq),
            generated_code,
        }
    }
}

impl Default for StageController {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_THRESHOLD)
    }
}

/// Deduplicates options preserving first occurrence, dropping blanks.
pub fn dedupe_options(options: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty() && seen.insert(o.to_string()))
        .map(str::to_string)
        .collect()
}

fn normalize_mcq(mcq: &Mcq) -> Option<Mcq> {
    let options = dedupe_options(&mcq.options);
    if options.is_empty() {
        return None;
    }
    Some(Mcq {
        question: mcq.question.clone(),
        options,
        is_multiselect: mcq.is_multiselect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{DeviceFacts, ProjectContext, StageTransition};

    fn contract(progress: Option<f64>) -> LmContract {
        LmContract {
            information: "info".into(),
            user_facts: DeviceFacts::new(),
            file_facts: vec![],
            chat_message: "msg".into(),
            mcq: None,
            progress,
            generated_code: None,
        }
    }

    fn request(stage: Stage) -> InteractionRequest {
        InteractionRequest::new(ProjectContext::new(), stage)
    }

    mod entry_stage {
        use super::*;

        #[test]
        fn no_transition_keeps_stage() {
            let stage = StageController::default()
                .resolve_entry_stage(&request(Stage::GatheringRequirements))
                .unwrap();
            assert_eq!(stage, Stage::GatheringRequirements);
        }

        #[test]
        fn one_hop_forward_is_allowed_without_force() {
            let req = request(Stage::GatheringRequirements)
                .with_transition(StageTransition::to(Stage::CodeGeneration));
            assert_eq!(
                StageController::default().resolve_entry_stage(&req).unwrap(),
                Stage::CodeGeneration
            );
        }

        #[test]
        fn skipping_requires_force() {
            let req = request(Stage::GatheringRequirements)
                .with_transition(StageTransition::to(Stage::RefinementTesting));
            let err = StageController::default().resolve_entry_stage(&req).unwrap_err();
            assert_eq!(err.field(), "transition");

            let forced = request(Stage::GatheringRequirements)
                .with_transition(StageTransition::forced(Stage::RefinementTesting));
            assert_eq!(
                StageController::default().resolve_entry_stage(&forced).unwrap(),
                Stage::RefinementTesting
            );
        }

        #[test]
        fn backwards_requires_force() {
            let req = request(Stage::RefinementTesting)
                .with_transition(StageTransition::to(Stage::GatheringRequirements));
            assert!(StageController::default().resolve_entry_stage(&req).is_err());

            let forced = request(Stage::RefinementTesting)
                .with_transition(StageTransition::forced(Stage::GatheringRequirements));
            assert_eq!(
                StageController::default().resolve_entry_stage(&forced).unwrap(),
                Stage::GatheringRequirements
            );
        }

        #[test]
        fn same_stage_transition_is_noop() {
            let req = request(Stage::CodeGeneration)
                .with_current_code("PROGRAM Main END_PROGRAM")
                .with_transition(StageTransition::to(Stage::CodeGeneration));
            assert_eq!(
                StageController::default().resolve_entry_stage(&req).unwrap(),
                Stage::CodeGeneration
            );
        }

        #[test]
        fn existing_code_moves_generation_to_refinement() {
            let req = request(Stage::CodeGeneration).with_current_code("PROGRAM Main END_PROGRAM");
            assert_eq!(
                StageController::default().resolve_entry_stage(&req).unwrap(),
                Stage::RefinementTesting
            );
        }

        #[test]
        fn generation_without_code_stays() {
            let req = request(Stage::CodeGeneration);
            assert_eq!(
                StageController::default().resolve_entry_stage(&req).unwrap(),
                Stage::CodeGeneration
            );
        }
    }

    mod progress {
        use super::*;

        #[test]
        fn progress_only_reported_while_gathering() {
            let controller = StageController::default();
            let decision = controller.advance(Stage::CodeGeneration, None, &contract(Some(0.5)));
            assert!(decision.progress.is_none());
        }

        #[test]
        fn progress_is_clamped() {
            let decision = StageController::default().advance(
                Stage::GatheringRequirements,
                None,
                &contract(Some(-3.0)),
            );
            assert_eq!(decision.progress, Some(Progress::ZERO));
        }

        #[test]
        fn progress_never_decreases() {
            let decision = StageController::default().advance(
                Stage::GatheringRequirements,
                Some(Progress::clamped(0.6)),
                &contract(Some(0.4)),
            );
            assert_eq!(decision.progress, Some(Progress::clamped(0.6)));
        }

        #[test]
        fn missing_progress_keeps_previous() {
            let decision = StageController::default().advance(
                Stage::GatheringRequirements,
                Some(Progress::clamped(0.3)),
                &contract(None),
            );
            assert_eq!(decision.progress, Some(Progress::clamped(0.3)));
        }

        #[test]
        fn reset_allows_lower_progress() {
            let decision = StageController::default().advance(
                Stage::GatheringRequirements,
                None,
                &contract(Some(0.1)),
            );
            assert_eq!(decision.progress, Some(Progress::clamped(0.1)));
        }
    }

    mod transitions {
        use super::*;

        #[test]
        fn below_threshold_stays_gathering() {
            let decision = StageController::default().advance(
                Stage::GatheringRequirements,
                None,
                &contract(Some(0.79)),
            );
            assert_eq!(decision.stage, Stage::GatheringRequirements);
        }

        #[test]
        fn threshold_moves_to_code_generation() {
            let decision = StageController::default().advance(
                Stage::GatheringRequirements,
                None,
                &contract(Some(0.8)),
            );
            assert_eq!(decision.stage, Stage::CodeGeneration);
        }

        #[test]
        fn custom_threshold_is_respected() {
            let decision = StageController::new(0.95).advance(
                Stage::GatheringRequirements,
                None,
                &contract(Some(0.9)),
            );
            assert_eq!(decision.stage, Stage::GatheringRequirements);
        }

        #[test]
        fn code_generation_response_keeps_stage() {
            let mut response = contract(None);
            response.generated_code = Some("PROGRAM Main END_PROGRAM".into());
            let decision = StageController::default().advance(Stage::CodeGeneration, None, &response);
            assert_eq!(decision.stage, Stage::CodeGeneration);
            assert_eq!(decision.generated_code.as_deref(), Some("PROGRAM Main END_PROGRAM"));
        }

        #[test]
        fn code_is_dropped_outside_code_generation() {
            let mut response = contract(None);
            response.generated_code = Some("PROGRAM Main END_PROGRAM".into());
            let decision = StageController::default().advance(Stage::RefinementTesting, None, &response);
            assert!(decision.generated_code.is_none());
            assert_eq!(decision.stage, Stage::RefinementTesting);
        }
    }

    mod mcq {
        use super::*;

        #[test]
        fn options_are_deduplicated_in_order() {
            let options = vec!["B".to_string(), "A".into(), "B".into(), " A ".into(), "".into()];
            assert_eq!(dedupe_options(&options), vec!["B", "A"]);
        }

        #[test]
        fn mcq_is_propagated_verbatim() {
            let mut response = contract(Some(0.2));
            response.mcq = Some(Mcq {
                question: "Which PLC platform?".into(),
                options: vec!["Siemens S7".into(), "Allen-Bradley".into(), "Siemens S7".into()],
                is_multiselect: true,
            });
            let decision = StageController::default().advance(Stage::GatheringRequirements, None, &response);
            let mcq = decision.mcq.unwrap();
            assert_eq!(mcq.question, "Which PLC platform?");
            assert_eq!(mcq.options, vec!["Siemens S7", "Allen-Bradley"]);
            assert!(mcq.is_multiselect);
        }

        #[test]
        fn all_blank_options_drop_mcq() {
            let mut response = contract(Some(0.2));
            response.mcq = Some(Mcq {
                question: "Q?".into(),
                options: vec![" ".into()],
                is_multiselect: false,
            });
            let decision = StageController::default().advance(Stage::GatheringRequirements, None, &response);
            assert!(decision.mcq.is_none());
        }
    }
}
