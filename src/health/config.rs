//! Configuration for health feedback.

use serde::{Deserialize, Serialize};

/// Thresholds for status transitions driven by dispatch outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Whether dispatch outcomes update backend status
    pub enabled: bool,
    /// Consecutive failures before marking degraded
    pub degraded_after: u32,
    /// Consecutive failures before marking unavailable
    pub unavailable_after: u32,
    /// Consecutive successes before marking available again
    pub recovery_after: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            degraded_after: 3,
            unavailable_after: 10,
            recovery_after: 2,
        }
    }
}
