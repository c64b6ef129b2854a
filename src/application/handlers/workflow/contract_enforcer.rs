//! ContractEnforcer - Obtains a valid response contract through the gateway.
//!
//! Each gateway reply is parsed against the fixed contract. A violation is
//! quoted back to the model in a corrective turn appended to the original
//! conversation, up to a bounded number of corrections.

use std::sync::Arc;

use crate::domain::workflow::{
    truncate_chars, ContractExpectations, ContractParser, ContractViolation, LmContract,
    UsageReport, REQUIRED_FIELDS,
};
use crate::ports::{CompletionGateway, CompletionRequest, GatewayReply, MessageRole};

use super::WorkflowError;

/// Default number of corrective re-prompts after the first attempt.
pub const DEFAULT_MAX_CORRECTIONS: u32 = 2;

/// Characters of invalid output quoted back in a corrective turn.
const QUOTED_OUTPUT_CHARS: usize = 2000;

/// A contract accepted by the parser, with the cost of obtaining it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnforcedContract {
    pub contract: LmContract,
    pub usage: UsageReport,
    /// Corrective re-prompts that were needed.
    pub corrections: u32,
}

/// Drives gateway calls until the contract is satisfied or the bound is hit.
pub struct ContractEnforcer {
    gateway: Arc<dyn CompletionGateway>,
    parser: ContractParser,
    max_corrections: u32,
}

impl ContractEnforcer {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            gateway,
            parser: ContractParser::new(),
            max_corrections: DEFAULT_MAX_CORRECTIONS,
        }
    }

    pub fn with_max_corrections(mut self, max_corrections: u32) -> Self {
        self.max_corrections = max_corrections;
        self
    }

    pub fn max_corrections(&self) -> u32 {
        self.max_corrections
    }

    /// Requests completions until one parses into a valid contract.
    pub async fn obtain(
        &self,
        request: CompletionRequest,
        expectations: &ContractExpectations,
    ) -> Result<EnforcedContract, WorkflowError> {
        let mut request = request;
        let mut usage = UsageReport::default();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let reply = self.gateway.complete(request.clone()).await?;
            accumulate(&mut usage, &reply);

            match self.parser.parse(&reply.text, expectations) {
                Ok(contract) => {
                    if attempt > 1 {
                        tracing::info!(
                            request_id = %request.metadata.request_id,
                            attempts = attempt,
                            "Contract satisfied after correction"
                        );
                    }
                    return Ok(EnforcedContract {
                        contract,
                        usage,
                        corrections: attempt - 1,
                    });
                }
                Err(violation) => {
                    if attempt > self.max_corrections {
                        tracing::error!(
                            request_id = %request.metadata.request_id,
                            attempts = attempt,
                            violation = %violation,
                            "Contract still violated; giving up"
                        );
                        return Err(WorkflowError::contract_failure(attempt, violation));
                    }

                    tracing::warn!(
                        request_id = %request.metadata.request_id,
                        attempt,
                        model = %reply.model,
                        violation = %violation,
                        "Model response violated contract; re-prompting"
                    );
                    request = corrective_request(request, &reply.text, &violation);
                }
            }
        }
    }
}

fn accumulate(usage: &mut UsageReport, reply: &GatewayReply) {
    usage.model = reply.model.clone();
    usage.calls += 1;
    usage.prompt_tokens += reply.usage.prompt_tokens;
    usage.completion_tokens += reply.usage.completion_tokens;
    usage.estimated_cost_cents += reply.usage.estimated_cost_cents;
}

/// Appends the rejected output and the violated constraint to the conversation.
fn corrective_request(
    request: CompletionRequest,
    raw: &str,
    violation: &ContractViolation,
) -> CompletionRequest {
    let quoted = truncate_chars(raw, QUOTED_OUTPUT_CHARS);
    let instruction = format!(
        "Your previous response was rejected: {}.\n\
         Fix this and respond again following the original instructions. \
         The response must contain every key ({}) even when its value is null.\n\
         Return only the corrected JSON object, with no prose and no code fences.",
        violation,
        REQUIRED_FIELDS.join(", ")
    );

    request
        .with_message(MessageRole::Assistant, quoted)
        .with_message(MessageRole::User, instruction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::Stage;
    use crate::ports::{AIError, GatewayError, RequestMetadata, TokenUsage};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const VALID: &str = r#"{
        "information": "Conveyor with one motor",
        "user_facts": {},
        "file_facts": [],
        "chat_message": "Which sensor stops the belt?",
        "mcq": null,
        "progress": 0.2,
        "generated_code": null
    }"#;

    struct ScriptedGateway {
        replies: Mutex<VecDeque<Result<String, GatewayError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedGateway {
        fn new(replies: Vec<Result<String, GatewayError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn always(text: &str) -> Self {
            Self::new((0..10).map(|_| Ok(text.to_string())).collect())
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionGateway for ScriptedGateway {
        async fn complete(&self, request: CompletionRequest) -> Result<GatewayReply, GatewayError> {
            self.requests.lock().unwrap().push(request);
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GatewayError::NoCandidates));
            next.map(|text| GatewayReply {
                text,
                usage: TokenUsage::new(100, 50, 2),
                model: "mock-model".into(),
                attempts: 1,
            })
        }

        fn candidates(&self) -> Vec<String> {
            vec!["mock-model".into()]
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(RequestMetadata::new("req-1").with_stage(Stage::GatheringRequirements))
            .with_system_prompt("system")
            .with_message(MessageRole::User, "original instructions")
    }

    fn expectations() -> ContractExpectations {
        ContractExpectations::for_stage(Stage::GatheringRequirements)
    }

    #[tokio::test]
    async fn valid_first_response_needs_no_correction() {
        let gateway = Arc::new(ScriptedGateway::always(VALID));
        let enforcer = ContractEnforcer::new(gateway.clone());

        let result = enforcer.obtain(request(), &expectations()).await.unwrap();

        assert_eq!(result.corrections, 0);
        assert_eq!(result.usage.calls, 1);
        assert_eq!(result.usage.model, "mock-model");
        assert_eq!(result.contract.chat_message, "Which sensor stops the belt?");
        assert_eq!(gateway.requests().len(), 1);
    }

    #[tokio::test]
    async fn corrective_prompt_quotes_output_and_violation() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok("Sure! Here is what I found.".to_string()),
            Ok(VALID.to_string()),
        ]));
        let enforcer = ContractEnforcer::new(gateway.clone());

        let result = enforcer.obtain(request(), &expectations()).await.unwrap();

        assert_eq!(result.corrections, 1);
        assert_eq!(result.usage.calls, 2);
        assert_eq!(result.usage.prompt_tokens, 200);
        assert_eq!(result.usage.estimated_cost_cents, 4);

        let requests = gateway.requests();
        let retry = &requests[1];
        assert_eq!(retry.system_prompt.as_deref(), Some("system"));
        assert_eq!(retry.messages.len(), 3);
        assert_eq!(retry.messages[0].content, "original instructions");
        assert_eq!(retry.messages[1].role, MessageRole::Assistant);
        assert_eq!(retry.messages[1].content, "Sure! Here is what I found.");
        assert_eq!(retry.messages[2].role, MessageRole::User);
        assert!(retry.messages[2]
            .content
            .contains(&ContractViolation::NoJson.to_string()));
        assert!(retry.messages[2].content.contains("Return only the corrected JSON object"));
    }

    #[tokio::test]
    async fn missing_field_is_corrected_like_garbage() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(r#"{"information": "x", "chat_message": "hi"}"#.to_string()),
            Ok(VALID.to_string()),
        ]));
        let enforcer = ContractEnforcer::new(gateway.clone());

        let result = enforcer.obtain(request(), &expectations()).await.unwrap();

        assert_eq!(result.corrections, 1);
        assert!(gateway.requests()[1].messages[2].content.contains("is missing"));
    }

    #[tokio::test]
    async fn gives_up_after_configured_corrections() {
        let gateway = Arc::new(ScriptedGateway::always("not json at all"));
        let enforcer = ContractEnforcer::new(gateway.clone()).with_max_corrections(2);

        let err = enforcer.obtain(request(), &expectations()).await.unwrap_err();

        assert_eq!(
            err,
            WorkflowError::contract_failure(3, ContractViolation::NoJson)
        );
        assert_eq!(gateway.requests().len(), 3);
    }

    #[tokio::test]
    async fn zero_corrections_fails_on_first_violation() {
        let gateway = Arc::new(ScriptedGateway::always("[]"));
        let enforcer = ContractEnforcer::new(gateway.clone()).with_max_corrections(0);

        let err = enforcer.obtain(request(), &expectations()).await.unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::ContractParseFailure { attempts: 1, .. }
        ));
        assert_eq!(gateway.requests().len(), 1);
    }

    #[tokio::test]
    async fn gateway_failure_is_not_retried() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Err(GatewayError::Exhausted {
            candidates: 2,
            attempts: 2,
            last_error: AIError::rate_limited(30),
        })]));
        let enforcer = ContractEnforcer::new(gateway.clone());

        let err = enforcer.obtain(request(), &expectations()).await.unwrap_err();

        assert!(matches!(err, WorkflowError::BackendExhausted { .. }));
        assert_eq!(gateway.requests().len(), 1);
    }

    #[tokio::test]
    async fn long_invalid_output_is_truncated_in_correction() {
        let garbage = "x".repeat(QUOTED_OUTPUT_CHARS * 2);
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(garbage), Ok(VALID.to_string())]));
        let enforcer = ContractEnforcer::new(gateway.clone());

        enforcer.obtain(request(), &expectations()).await.unwrap();

        let quoted = &gateway.requests()[1].messages[1].content;
        assert!(quoted.chars().count() < QUOTED_OUTPUT_CHARS * 2);
    }
}
