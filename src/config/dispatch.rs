//! Dispatch configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-attempt timeout and overall deadline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Safety factor applied to a backend's expected latency
    pub timeout_multiplier: f64,
    pub min_timeout_ms: u64,
    pub max_timeout_ms: u64,
    /// Budget for a whole dispatch, across all attempts
    pub overall_deadline_ms: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_multiplier: 3.0,
            min_timeout_ms: 100,
            max_timeout_ms: 60_000,
            overall_deadline_ms: None,
        }
    }
}

impl DispatchConfig {
    /// Timeout derived from expected latency, clamped to the configured bounds.
    pub fn timeout_for_latency(&self, expected_latency_ms: u32) -> Duration {
        let scaled = (expected_latency_ms as f64 * self.timeout_multiplier).ceil();
        let ms = if scaled.is_finite() && scaled > 0.0 {
            scaled as u64
        } else {
            0
        };
        Duration::from_millis(ms.clamp(self.min_timeout_ms, self.max_timeout_ms))
    }

    pub fn overall_deadline(&self) -> Option<Duration> {
        self.overall_deadline_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_scales_latency() {
        let config = DispatchConfig::default();
        assert_eq!(config.timeout_for_latency(500), Duration::from_millis(1500));
    }

    #[test]
    fn test_timeout_is_clamped() {
        let config = DispatchConfig {
            timeout_multiplier: 2.0,
            min_timeout_ms: 250,
            max_timeout_ms: 10_000,
            overall_deadline_ms: None,
        };
        assert_eq!(config.timeout_for_latency(10), Duration::from_millis(250));
        assert_eq!(
            config.timeout_for_latency(60_000),
            Duration::from_millis(10_000)
        );
    }
}
