//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid base URL format")]
    InvalidBaseUrl,

    #[error("No candidate models configured")]
    NoModelsConfigured,

    #[error("Temperature for {0} must be between 0.0 and 2.0")]
    InvalidTemperature(&'static str),

    #[error("Max tokens for {0} must be positive")]
    InvalidMaxTokens(&'static str),

    #[error("Progress threshold must be in (0.0, 1.0]")]
    InvalidProgressThreshold,

    #[error("Interaction timeout must be between 1 and 600 seconds")]
    InvalidInteractionTimeout,

    #[error("{0} must be positive")]
    MustBePositive(&'static str),

    #[error("Unknown log filter directive: {0}")]
    InvalidLogFilter(String),
}
