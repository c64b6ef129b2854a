//! Language model configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::{GenerationParams, StageGeneration};

/// Language model configuration
#[derive(Debug, Deserialize)]
pub struct AiConfig {
    /// OpenAI API key
    pub openai_api_key: Option<Secret<String>>,

    /// Chat completions base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Candidate models in priority order (comma-separated)
    #[serde(default = "default_models")]
    pub models: String,

    /// Per-attempt request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Retries of a transient failure on the same model
    #[serde(default = "default_transient_retries")]
    pub max_transient_retries: u32,

    /// Base delay for exponential backoff
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_gathering_max_tokens")]
    pub gathering_max_tokens: u32,

    #[serde(default = "default_gathering_temperature")]
    pub gathering_temperature: f32,

    #[serde(default = "default_code_generation_max_tokens")]
    pub code_generation_max_tokens: u32,

    #[serde(default = "default_code_generation_temperature")]
    pub code_generation_temperature: f32,

    #[serde(default = "default_refinement_max_tokens")]
    pub refinement_max_tokens: u32,

    #[serde(default = "default_refinement_temperature")]
    pub refinement_temperature: f32,
}

impl AiConfig {
    /// Get per-attempt timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get backoff base as Duration
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Candidate models, blanks removed
    pub fn model_list(&self) -> Vec<String> {
        self.models
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect()
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        use secrecy::ExposeSecret;
        self.openai_api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    /// Sampling parameters per stage
    pub fn stage_generation(&self) -> StageGeneration {
        StageGeneration {
            gathering: GenerationParams::new(self.gathering_max_tokens, self.gathering_temperature),
            code_generation: GenerationParams::new(
                self.code_generation_max_tokens,
                self.code_generation_temperature,
            ),
            refinement: GenerationParams::new(self.refinement_max_tokens, self.refinement_temperature),
        }
    }

    /// Validate language model configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_api_key() {
            return Err(ValidationError::MissingRequired("OPENAI_API_KEY"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if self.model_list().is_empty() {
            return Err(ValidationError::NoModelsConfigured);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 600 {
            return Err(ValidationError::InvalidTimeout);
        }

        for (stage, params) in [
            ("gathering", (self.gathering_max_tokens, self.gathering_temperature)),
            ("code_generation", (self.code_generation_max_tokens, self.code_generation_temperature)),
            ("refinement", (self.refinement_max_tokens, self.refinement_temperature)),
        ] {
            let (max_tokens, temperature) = params;
            if max_tokens == 0 {
                return Err(ValidationError::InvalidMaxTokens(stage));
            }
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ValidationError::InvalidTemperature(stage));
            }
        }

        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            base_url: default_base_url(),
            models: default_models(),
            request_timeout_secs: default_timeout(),
            max_transient_retries: default_transient_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            gathering_max_tokens: default_gathering_max_tokens(),
            gathering_temperature: default_gathering_temperature(),
            code_generation_max_tokens: default_code_generation_max_tokens(),
            code_generation_temperature: default_code_generation_temperature(),
            refinement_max_tokens: default_refinement_max_tokens(),
            refinement_temperature: default_refinement_temperature(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_models() -> String {
    "gpt-4o,gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_transient_retries() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_gathering_max_tokens() -> u32 {
    1024
}

fn default_gathering_temperature() -> f32 {
    0.7
}

fn default_code_generation_max_tokens() -> u32 {
    2048
}

fn default_code_generation_temperature() -> f32 {
    0.3
}

fn default_refinement_max_tokens() -> u32 {
    1536
}

fn default_refinement_temperature() -> f32 {
    0.7
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> AiConfig {
        AiConfig {
            openai_api_key: Some(Secret::new("sk-test".to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_ai_config_defaults() {
        let config = AiConfig::default();
        assert_eq!(config.model_list(), vec!["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.max_transient_retries, 2);
        assert_eq!(config.backoff_base(), Duration::from_millis(500));
    }

    #[test]
    fn test_defaults_match_stage_generation_defaults() {
        assert_eq!(AiConfig::default().stage_generation(), StageGeneration::default());
    }

    #[test]
    fn test_model_list_trims_blanks() {
        let config = AiConfig {
            models: " gpt-4o , ,gpt-4o-mini,".to_string(),
            ..with_key()
        };
        assert_eq!(config.model_list(), vec!["gpt-4o", "gpt-4o-mini"]);
    }

    #[test]
    fn test_validation_requires_key() {
        assert_eq!(
            AiConfig::default().validate(),
            Err(ValidationError::MissingRequired("OPENAI_API_KEY"))
        );
        let blank = AiConfig {
            openai_api_key: Some(Secret::new("  ".to_string())),
            ..Default::default()
        };
        assert!(!blank.has_api_key());
    }

    #[test]
    fn test_validation_requires_models() {
        let config = AiConfig {
            models: ",".to_string(),
            ..with_key()
        };
        assert_eq!(config.validate(), Err(ValidationError::NoModelsConfigured));
    }

    #[test]
    fn test_validation_rejects_bad_temperature() {
        let config = AiConfig {
            code_generation_temperature: 2.5,
            ..with_key()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidTemperature("code_generation"))
        );
    }

    #[test]
    fn test_validation_rejects_zero_tokens() {
        let config = AiConfig {
            refinement_max_tokens: 0,
            ..with_key()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidMaxTokens("refinement")));
    }

    #[test]
    fn test_validation_rejects_non_http_url() {
        let config = AiConfig {
            base_url: "api.openai.com".to_string(),
            ..with_key()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidBaseUrl));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(with_key().validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", with_key());
        assert!(!rendered.contains("sk-test"));
    }
}
