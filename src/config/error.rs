//! Errors raised while loading or validating a Switchyard configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file not found: {} (run `switchyard config init`)", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed, but a backend, capability or policy entry is inconsistent.
    #[error("invalid config at '{field}': {message}")]
    Validation { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Offending field for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_points_at_config_init() {
        let err = ConfigError::NotFound(PathBuf::from("fleet.toml"));
        let message = err.to_string();
        assert!(message.contains("fleet.toml"));
        assert!(message.contains("switchyard config init"));
    }

    #[test]
    fn test_validation_names_field() {
        let err = ConfigError::validation("capabilities[0].active", "unknown backend 'ghost'");
        assert_eq!(err.field(), Some("capabilities[0].active"));
        assert_eq!(
            err.to_string(),
            "invalid config at 'capabilities[0].active': unknown backend 'ghost'"
        );
        assert_eq!(ConfigError::NotFound(PathBuf::new()).field(), None);
    }
}
