//! Configuration for the copilot binary and its workflow engine.
//!
//! Four sections (`ai`, `workflow`, `sessions`, `logging`) are read from
//! `PLC_COPILOT__<SECTION>__<KEY>` environment variables, with an optional
//! `.env` file for development. Everything except the API key has a default.
//!
//! # Example
//!
//! ```no_run
//! use plc_copilot::config::AppConfig;
//!
//! let config = AppConfig::load().expect("configuration loads");
//! config.validate().expect("configuration is valid");
//!
//! println!("Models: {:?}", config.ai.model_list());
//! ```

mod ai;
mod error;
mod logging;
mod sessions;
mod workflow;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use sessions::SessionsConfig;
pub use workflow::WorkflowConfig;

use serde::Deserialize;

use crate::application::WorkflowSettings;

/// Root application configuration
///
/// Every section has defaults; only the API key must be supplied.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Language model configuration (OpenAI, model cascade)
    #[serde(default)]
    pub ai: AiConfig,

    /// Workflow engine tunables
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Session file storage
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PLC_COPILOT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PLC_COPILOT__AI__OPENAI_API_KEY=sk-...` -> `ai.openai_api_key = ...`
    /// - `PLC_COPILOT__WORKFLOW__MAX_CORRECTIONS=3` -> `workflow.max_corrections = 3`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PLC_COPILOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.workflow.validate()?;
        self.sessions.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Orchestrator settings drawn from the workflow and ai sections
    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            progress_threshold: self.workflow.progress_threshold,
            max_corrections: self.workflow.max_corrections,
            interaction_timeout: self.workflow.interaction_timeout(),
            input_limits: self.workflow.input_limits(),
            file_text_cap: self.workflow.file_text_cap,
            generation: self.ai.stage_generation(),
        }
    }
}
