//! OpenAI Provider - Implementation of LanguageModel for OpenAI's chat API.
//!
//! One provider instance serves one model and makes exactly one HTTP attempt
//! per call. Retries, reshaping and fallback belong to `ModelCascade`, so
//! failures are classified here and returned immediately.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_model("gpt-4o")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{
    AIError, CompletionRequest, CompletionResponse, FinishReason, LanguageModel, MessageRole,
    ProviderInfo, ResponseFormat, TokenLimitParam, TokenUsage,
};

/// Retry delay assumed when a 429 carries no hint.
const DEFAULT_RETRY_AFTER_SECS: u32 = 30;

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use (e.g., "gpt-4o", "gpt-4o-mini").
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_secret(Secret::new(api_key.into()))
    }

    /// Creates a new configuration from an already-wrapped key.
    pub fn from_secret(api_key: Secret<String>) -> Self {
        Self {
            api_key,
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI API provider implementation.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a new OpenAI provider with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Builds the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Converts our request to OpenAI's format.
    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref prompt) = request.system_prompt {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: prompt.clone(),
            });
        }

        for msg in &request.messages {
            messages.push(OpenAIMessage {
                role: match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            });
        }

        let (max_tokens, max_completion_tokens) = match request.token_limit_param {
            TokenLimitParam::MaxTokens => (request.max_tokens, None),
            TokenLimitParam::MaxCompletionTokens => (None, request.max_tokens),
        };

        OpenAIRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens,
            max_completion_tokens,
            temperature: request.temperature,
            response_format: match request.response_format {
                ResponseFormat::JsonObject => Some(OpenAIResponseFormat {
                    kind: "json_object".to_string(),
                }),
                ResponseFormat::Text => None,
            },
        }
    }

    /// Sends a request.
    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        let openai_request = self.to_openai_request(request);

        self.client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::timeout(self.config.timeout.as_secs() as u32)
                } else if e.is_connect() {
                    AIError::network(format!("Connection failed: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })
    }

    /// Parses the API response status and handles errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, AIError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let error_body = response.text().await.unwrap_or_default();

        Err(classify_error(status.as_u16(), retry_after.as_deref(), &error_body))
    }

    /// Parses a successful response.
    async fn parse_response(&self, response: Response) -> Result<CompletionResponse, AIError> {
        let response = self.handle_response_status(response).await?;

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AIError::parse("No choices in response"))?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        if finish_reason == FinishReason::ContentFilter {
            return Err(AIError::content_filtered("completion stopped by content filter"));
        }

        let usage = openai_response
            .usage
            .map(|u| {
                TokenUsage::new(
                    u.prompt_tokens,
                    u.completion_tokens,
                    calculate_cost(&self.config.model, u.prompt_tokens, u.completion_tokens),
                )
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: openai_response.model,
            finish_reason,
        })
    }
}

/// Maps a failed HTTP response onto an `AIError`.
fn classify_error(status: u16, retry_after: Option<&str>, body: &str) -> AIError {
    match status {
        401 | 403 => AIError::AuthenticationFailed,
        429 => AIError::rate_limited(
            retry_after
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or_else(|| parse_retry_after(body)),
        ),
        400 | 422 => {
            if let Some(param) = unsupported_parameter(body) {
                AIError::parameter_rejected(param, error_message(body))
            } else if body.contains("maximum context length")
                || body.contains("context_length_exceeded")
            {
                AIError::context_too_long(0, 0)
            } else {
                AIError::InvalidRequest(error_message(body))
            }
        }
        408 => AIError::timeout(0),
        500..=599 => AIError::unavailable(format!("Server error {}: {}", status, error_message(body))),
        _ => AIError::network(format!("Unexpected status {}: {}", status, error_message(body))),
    }
}

/// Extracts `x` from `Unsupported parameter: 'x'` (or `Unsupported value: 'x'`).
fn unsupported_parameter(body: &str) -> Option<String> {
    for marker in ["Unsupported parameter: '", "Unsupported value: '"] {
        if let Some(idx) = body.find(marker) {
            let rest = &body[idx + marker.len()..];
            if let Some(end) = rest.find('\'') {
                let param = &rest[..end];
                if !param.is_empty() {
                    return Some(param.to_string());
                }
            }
        }
    }

    // Fall back to the structured `param` field when the code says so.
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = parsed.get("error")?;
    let code = error.get("code").and_then(|c| c.as_str())?;
    if code == "unsupported_parameter" || code == "unsupported_value" {
        error.get("param").and_then(|p| p.as_str()).map(str::to_string)
    } else {
        None
    }
}

/// The `error.message` field, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Parses "try again in Xs" from an error body.
fn parse_retry_after(error_body: &str) -> u32 {
    let message = error_message(error_body);
    if let Some(idx) = message.find("try again in ") {
        let rest = &message[idx + "try again in ".len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(secs) = digits.parse::<u32>() {
            return secs;
        }
    }
    DEFAULT_RETRY_AFTER_SECS
}

/// Calculates estimated cost in cents based on model and token counts.
fn calculate_cost(model: &str, prompt_tokens: u32, completion_tokens: u32) -> u32 {
    // Prices per 1M tokens (in cents)
    let (prompt_price, completion_price): (u64, u64) = match model {
        m if m.starts_with("gpt-4o-mini") => (15, 60),
        m if m.starts_with("gpt-4o") => (250, 1000),
        m if m.starts_with("gpt-4.1-mini") => (40, 160),
        m if m.starts_with("gpt-4.1") => (200, 800),
        m if m.starts_with("gpt-4-turbo") => (1000, 3000),
        m if m.starts_with("gpt-4") => (3000, 6000),
        m if m.starts_with("gpt-3.5") => (50, 150),
        m if m.starts_with("o1") || m.starts_with("o3") => (1500, 6000),
        _ => (250, 1000),
    };

    let prompt_cost = (prompt_tokens as u64 * prompt_price) / 1_000_000;
    let completion_cost = (completion_tokens as u64 * completion_price) / 1_000_000;

    (prompt_cost + completion_cost) as u32
}

#[async_trait]
impl LanguageModel for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send_request(&request).await?;
        self.parse_response(response).await
    }

    fn estimate_tokens(&self, text: &str) -> u32 {
        // GPT models use ~4 characters per token on average
        (text.len() / 4).max(1) as u32
    }

    fn provider_info(&self) -> ProviderInfo {
        let max_context = match self.config.model.as_str() {
            m if m.starts_with("gpt-4.1") => 1_047_576,
            m if m.starts_with("gpt-4-turbo") || m.starts_with("gpt-4o") => 128_000,
            m if m.starts_with("o1") || m.starts_with("o3") => 200_000,
            m if m.starts_with("gpt-4") => 8192,
            m if m.contains("16k") => 16384,
            m if m.starts_with("gpt-3.5") => 4096,
            _ => 128_000,
        };

        ProviderInfo::new("openai", &self.config.model, max_context)
    }
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAIResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RequestMetadata;

    fn provider(model: &str) -> OpenAIProvider {
        OpenAIProvider::new(OpenAIConfig::new("test").with_model(model)).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(RequestMetadata::new("req-1"))
            .with_system_prompt("You are a PLC assistant.")
            .with_message(MessageRole::User, "Hello")
            .with_max_tokens(512)
            .with_temperature(0.3)
            .with_json_response()
    }

    #[test]
    fn config_builder_works() {
        let config = OpenAIConfig::new("test-key")
            .with_model("gpt-4o-mini")
            .with_base_url("https://custom.api.com")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.base_url, "https://custom.api.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn completions_url_tolerates_trailing_slash() {
        let provider = OpenAIProvider::new(
            OpenAIConfig::new("k").with_base_url("http://localhost:8080/v1/"),
        )
        .unwrap();
        assert_eq!(provider.completions_url(), "http://localhost:8080/v1/chat/completions");
    }

    mod request_shape {
        use super::*;

        #[test]
        fn sends_max_completion_tokens_by_default() {
            let body = serde_json::to_value(provider("gpt-4o").to_openai_request(&request())).unwrap();

            assert_eq!(body["max_completion_tokens"], 512);
            assert!(body.get("max_tokens").is_none());
            assert_eq!(body["response_format"]["type"], "json_object");
            assert_eq!(body["messages"][0]["role"], "system");
            assert_eq!(body["messages"][1]["content"], "Hello");
        }

        #[test]
        fn sends_max_tokens_when_reshaped() {
            let reshaped = request().with_token_limit_param(TokenLimitParam::MaxTokens);
            let body = serde_json::to_value(provider("gpt-4o").to_openai_request(&reshaped)).unwrap();

            assert_eq!(body["max_tokens"], 512);
            assert!(body.get("max_completion_tokens").is_none());
        }

        #[test]
        fn omits_response_format_for_text() {
            let mut plain = request();
            plain.response_format = ResponseFormat::Text;
            let body = serde_json::to_value(provider("gpt-4o").to_openai_request(&plain)).unwrap();

            assert!(body.get("response_format").is_none());
        }
    }

    mod error_classification {
        use super::*;

        #[test]
        fn unsupported_parameter_is_rejected_param() {
            let body = r#"{"error":{"message":"Unsupported parameter: 'max_tokens' is not supported with this model. Use 'max_completion_tokens' instead.","type":"invalid_request_error","param":"max_tokens","code":"unsupported_parameter"}}"#;

            let err = classify_error(400, None, body);

            assert!(matches!(err, AIError::ParameterRejected { ref param, .. } if param == "max_tokens"));
        }

        #[test]
        fn unsupported_value_is_rejected_param() {
            let body = r#"{"error":{"message":"Unsupported value: 'temperature' does not support 0.7 with this model.","code":"unsupported_value","param":"temperature"}}"#;

            let err = classify_error(400, None, body);

            assert!(matches!(err, AIError::ParameterRejected { ref param, .. } if param == "temperature"));
        }

        #[test]
        fn structured_code_without_message_marker() {
            let body = r#"{"error":{"message":"nope","code":"unsupported_parameter","param":"max_completion_tokens"}}"#;
            assert_eq!(unsupported_parameter(body), Some("max_completion_tokens".to_string()));
        }

        #[test]
        fn context_length_is_fatal() {
            let body = r#"{"error":{"message":"This model's maximum context length is 8192 tokens","code":"context_length_exceeded"}}"#;
            assert_eq!(classify_error(400, None, body), AIError::context_too_long(0, 0));
        }

        #[test]
        fn other_bad_request_is_invalid() {
            let body = r#"{"error":{"message":"messages is required"}}"#;
            assert_eq!(
                classify_error(400, None, body),
                AIError::InvalidRequest("messages is required".into())
            );
        }

        #[test]
        fn retry_after_header_wins() {
            let body = r#"{"error":{"message":"Rate limit exceeded. Please try again in 20s."}}"#;
            assert_eq!(classify_error(429, Some("7"), body), AIError::rate_limited(7));
        }

        #[test]
        fn retry_after_from_message() {
            let body = r#"{"error":{"message":"Rate limit exceeded. Please try again in 20s."}}"#;
            assert_eq!(classify_error(429, None, body), AIError::rate_limited(20));
        }

        #[test]
        fn retry_after_default() {
            let body = r#"{"error":{"message":"Something went wrong"}}"#;
            assert_eq!(parse_retry_after(body), DEFAULT_RETRY_AFTER_SECS);
        }

        #[test]
        fn auth_and_server_errors() {
            assert_eq!(classify_error(401, None, ""), AIError::AuthenticationFailed);
            assert!(matches!(classify_error(503, None, "down"), AIError::Unavailable { .. }));
        }
    }

    #[test]
    fn cost_calculation_gpt4o() {
        // 1M prompt tokens = 250 cents, 1M completion tokens = 1000 cents
        assert_eq!(calculate_cost("gpt-4o", 1_000_000, 1_000_000), 1250);
        assert_eq!(calculate_cost("gpt-4o-2024-08-06", 4000, 1000), 2);
    }

    #[test]
    fn cost_calculation_mini_is_cheaper() {
        assert!(calculate_cost("gpt-4o-mini", 1_000_000, 0) < calculate_cost("gpt-4o", 1_000_000, 0));
    }

    #[test]
    fn provider_info_reports_model() {
        let info = provider("gpt-4o-mini").provider_info();
        assert_eq!(info.name, "openai");
        assert_eq!(info.model, "gpt-4o-mini");
        assert_eq!(info.max_context_tokens, 128_000);
    }

    #[test]
    fn estimate_tokens_approximates() {
        let provider = provider("gpt-4o");
        assert_eq!(provider.estimate_tokens("Hi"), 1);
        assert_eq!(provider.estimate_tokens("Hello, world!"), 3);
    }
}
