//! `[logging]` section

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// Modules that accept a `[logging.component_levels]` override.
pub const LOG_COMPONENTS: &[&str] = &[
    "admission",
    "api",
    "capability",
    "cli",
    "dispatch",
    "engine",
    "health",
    "policy",
    "registry",
    "telemetry",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("unknown log format '{}' (expected pretty or json)", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base filter; `RUST_LOG` replaces it entirely
    pub level: String,
    pub format: LogFormat,
    /// Per-module levels, e.g. `dispatch = "debug"` to trace fallback decisions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<HashMap<String, String>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: None,
        }
    }
}

impl LoggingConfig {
    /// First component override naming an unknown module or level, as
    /// `(component, message)`.
    pub fn invalid_component(&self) -> Option<(String, String)> {
        let levels = self.component_levels.as_ref()?;
        let mut components: Vec<_> = levels.iter().collect();
        components.sort();
        components.into_iter().find_map(|(component, level)| {
            if !LOG_COMPONENTS.contains(&component.as_str()) {
                Some((
                    component.clone(),
                    format!("unknown component (expected one of {})", LOG_COMPONENTS.join(", ")),
                ))
            } else if LevelFilter::from_str(level).is_err() {
                Some((component.clone(), format!("unknown level '{}'", level)))
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.invalid_component().is_none());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").unwrap_err().contains("pretty or json"));
    }

    #[test]
    fn test_dispatch_component_level() {
        let config: LoggingConfig = toml::from_str(
            r#"
            level = "warn"
            format = "json"
            [component_levels]
            dispatch = "trace"
            admission = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.invalid_component().is_none());
    }

    #[test]
    fn test_unknown_component_or_level() {
        let mut levels = HashMap::new();
        levels.insert("routing".to_string(), "debug".to_string());
        let config = LoggingConfig {
            component_levels: Some(levels),
            ..Default::default()
        };
        assert_eq!(config.invalid_component().unwrap().0, "routing");

        let mut levels = HashMap::new();
        levels.insert("policy".to_string(), "loud".to_string());
        let config = LoggingConfig {
            component_levels: Some(levels),
            ..Default::default()
        };
        let (component, message) = config.invalid_component().unwrap();
        assert_eq!(component, "policy");
        assert!(message.contains("loud"));
    }
}
