//! Configuration module for Switchyard
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`SWITCHYARD_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use switchyard::config::SwitchyardConfig;
//!
//! // Load defaults
//! let config = SwitchyardConfig::default();
//! assert_eq!(config.server.port, 7400);
//!
//! // Parse from TOML
//! let toml = r#"
//! [server]
//! port = 9000
//! "#;
//! let config: SwitchyardConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.server.port, 9000);
//! ```

pub mod admission;
pub mod backend;
pub mod capability;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod policy;
pub mod server;

pub use admission::AdmissionConfig;
pub use backend::BackendConfig;
pub use capability::CapabilityConfig;
pub use dispatch::DispatchConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use policy::PolicyConfig;
pub use server::ServerConfig;

// Re-export HealthConfig from health module
pub use crate::health::HealthConfig;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Annotated sample configuration written by `switchyard config init`.
pub const EXAMPLE_CONFIG: &str = include_str!("../../switchyard.example.toml");

/// Unified configuration for the Switchyard engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SwitchyardConfig {
    /// Admin HTTP server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Attempt timeouts and deadline
    pub dispatch: DispatchConfig,
    /// Default rate limits and pool sizes
    pub admission: AdmissionConfig,
    /// Status feedback thresholds
    pub health: HealthConfig,
    /// Static backend definitions
    pub backends: Vec<BackendConfig>,
    /// Capability routing definitions
    pub capabilities: Vec<CapabilityConfig>,
    /// Permission models
    pub policy: PolicyConfig,
}

impl SwitchyardConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                Ok(toml::from_str(&content)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports SWITCHYARD_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        // Server settings
        if let Ok(port) = std::env::var("SWITCHYARD_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("SWITCHYARD_HOST") {
            self.server.host = host;
        }

        // Logging settings
        if let Ok(level) = std::env::var("SWITCHYARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SWITCHYARD_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        // Dispatch and health feedback
        if let Ok(multiplier) = std::env::var("SWITCHYARD_TIMEOUT_MULTIPLIER") {
            if let Ok(m) = multiplier.parse::<f64>() {
                if m.is_finite() && m > 0.0 {
                    self.dispatch.timeout_multiplier = m;
                }
            }
        }
        if let Ok(health) = std::env::var("SWITCHYARD_HEALTH") {
            self.health.enabled = health.to_lowercase() == "true";
        }

        self
    }

    /// Validate configuration, reporting the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::validation("server.port", "port must be non-zero"));
        }

        if let Some((component, message)) = self.logging.invalid_component() {
            return Err(ConfigError::validation(
                format!("logging.component_levels.{}", component),
                message,
            ));
        }

        let multiplier = self.dispatch.timeout_multiplier;
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ConfigError::validation(
                "dispatch.timeout_multiplier",
                "must be a positive number",
            ));
        }
        if self.dispatch.min_timeout_ms > self.dispatch.max_timeout_ms {
            return Err(ConfigError::validation(
                "dispatch.min_timeout_ms",
                "must not exceed max_timeout_ms",
            ));
        }

        if self.health.degraded_after == 0 || self.health.recovery_after == 0 {
            return Err(ConfigError::validation(
                "health",
                "thresholds must be at least 1",
            ));
        }
        if self.health.unavailable_after < self.health.degraded_after {
            return Err(ConfigError::validation(
                "health.unavailable_after",
                "must be at least degraded_after",
            ));
        }

        if let Some(limit) = &self.admission.default_rate_limit {
            if let Err(e) = limit.validate() {
                return Err(ConfigError::validation(
                    "admission.default_rate_limit",
                    e.to_string(),
                ));
            }
        }

        let backends = self.validate_backends()?;
        self.validate_capabilities(&backends)?;
        self.validate_policy()?;

        Ok(())
    }

    fn validate_backends(&self) -> Result<HashMap<&str, &BackendConfig>, ConfigError> {
        let mut seen = HashMap::new();
        for (i, backend) in self.backends.iter().enumerate() {
            if backend.id.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("backends[{}].id", i),
                    "id cannot be empty",
                ));
            }
            if let Err(e) = backend.to_descriptor().validate() {
                return Err(ConfigError::validation(format!("backends[{}]", i), e.to_string()));
            }
            if let Some(limit) = &backend.rate_limit {
                if let Err(e) = limit.validate() {
                    return Err(ConfigError::validation(
                        format!("backends[{}].rate_limit", i),
                        e.to_string(),
                    ));
                }
            }
            if seen.insert(backend.id.as_str(), backend).is_some() {
                return Err(ConfigError::validation(
                    format!("backends[{}].id", i),
                    format!("duplicate backend id '{}'", backend.id),
                ));
            }
        }
        Ok(seen)
    }

    fn validate_capabilities(
        &self,
        backends: &HashMap<&str, &BackendConfig>,
    ) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (i, capability) in self.capabilities.iter().enumerate() {
            let field = |name: &str| format!("capabilities[{}].{}", i, name);

            if capability.id.trim().is_empty() {
                return Err(ConfigError::validation(field("id"), "id cannot be empty"));
            }
            if !seen.insert(capability.id.as_str()) {
                return Err(ConfigError::validation(
                    field("id"),
                    format!("duplicate capability id '{}'", capability.id),
                ));
            }
            if capability.auto_rank
                && (capability.active.is_some() || !capability.fallbacks.is_empty())
            {
                return Err(ConfigError::validation(
                    field("auto_rank"),
                    "auto_rank cannot be combined with active or fallbacks",
                ));
            }

            let supports = |backend_id: &str, name: &str| match backends.get(backend_id) {
                None => Err(ConfigError::validation(
                    field(name),
                    format!("unknown backend '{}'", backend_id),
                )),
                Some(b) if !b.capabilities.iter().any(|c| c == &capability.id) => {
                    Err(ConfigError::validation(
                        field(name),
                        format!(
                            "backend '{}' does not declare capability '{}'",
                            backend_id, capability.id
                        ),
                    ))
                }
                Some(_) => Ok(()),
            };

            if let Some(active) = &capability.active {
                supports(active, "active")?;
            }
            let mut chain = HashSet::new();
            for backend_id in &capability.fallbacks {
                supports(backend_id, "fallbacks")?;
                if capability.active.as_deref() == Some(backend_id.as_str()) {
                    return Err(ConfigError::validation(
                        field("fallbacks"),
                        format!("active backend '{}' cannot also be a fallback", backend_id),
                    ));
                }
                if !chain.insert(backend_id.as_str()) {
                    return Err(ConfigError::validation(
                        field("fallbacks"),
                        format!("backend '{}' listed twice", backend_id),
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_policy(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (i, model) in self.policy.models.iter().enumerate() {
            if let Err(e) = model.validate() {
                return Err(ConfigError::validation(
                    format!("policy.models[{}]", i),
                    e.to_string(),
                ));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(ConfigError::validation(
                    format!("policy.models[{}].id", i),
                    format!("duplicate model id '{}'", model.id),
                ));
            }
        }
        if let Some(active) = &self.policy.active {
            if !seen.contains(active.as_str()) {
                return Err(ConfigError::validation(
                    "policy.active",
                    format!("unknown permission model '{}'", active),
                ));
            }
        }
        Ok(())
    }
}
