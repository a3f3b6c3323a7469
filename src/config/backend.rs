//! Backend configuration

use crate::admission::RateLimit;
use crate::registry::{BackendDescriptor, BackendStatus, ContextLimits};
use serde::{Deserialize, Serialize};

/// Static backend definition from `[[backends]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    pub provider: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_context_length")]
    pub context_length: u32,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default = "default_latency_ms")]
    pub expected_latency_ms: u32,
    #[serde(default)]
    pub cost_per_unit: f64,
    #[serde(default = "default_reliability")]
    pub reliability: f64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub status: BackendStatus,
    /// Per-attempt timeout, overriding latency × multiplier
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Overrides `[admission].default_rate_limit`
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
    /// Overrides `[admission].default_max_connections`
    #[serde(default)]
    pub max_connections: Option<u32>,
}

fn default_context_length() -> u32 {
    ContextLimits::default().context_length
}

fn default_latency_ms() -> u32 {
    1000
}

fn default_reliability() -> f64 {
    1.0
}

impl BackendConfig {
    pub fn to_descriptor(&self) -> BackendDescriptor {
        BackendDescriptor::new(&self.id, &self.provider)
            .with_capabilities(self.capabilities.iter().cloned())
            .with_limits(ContextLimits {
                context_length: self.context_length,
                max_output_tokens: self.max_output_tokens,
            })
            .with_latency_ms(self.expected_latency_ms)
            .with_cost(self.cost_per_unit)
            .with_reliability(self.reliability)
            .with_priority(self.priority)
            .with_status(self.status)
    }
}
