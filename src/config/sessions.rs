//! Session file storage configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;

/// Session file storage configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionsConfig {
    /// Directory holding one subdirectory per session
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Inactivity after which a session's uploads are released
    #[serde(default = "default_session_timeout")]
    pub session_timeout_minutes: u64,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
}

impl SessionsConfig {
    /// Get session timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }

    /// Validate session storage configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.storage_dir.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("SESSIONS__STORAGE_DIR"));
        }
        if self.session_timeout_minutes == 0 {
            return Err(ValidationError::MustBePositive("session_timeout_minutes"));
        }
        if self.max_file_size_bytes == 0 {
            return Err(ValidationError::MustBePositive("max_file_size_bytes"));
        }
        Ok(())
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            session_timeout_minutes: default_session_timeout(),
            max_file_size_bytes: default_max_file_size(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data/sessions")
}

fn default_session_timeout() -> u64 {
    60
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_defaults() {
        let config = SessionsConfig::default();
        assert_eq!(config.storage_dir, PathBuf::from("./data/sessions"));
        assert_eq!(config.session_timeout(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_storage_dir_rejected() {
        let config = SessionsConfig {
            storage_dir: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = SessionsConfig {
            session_timeout_minutes: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MustBePositive("session_timeout_minutes"))
        );
    }
}
