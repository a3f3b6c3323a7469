use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use super::RegistryError;

/// Operating status of a backend.
///
/// Mutated only by health feedback; it never changes ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    /// Backend is serving normally
    #[default]
    Available,
    /// Backend is answering but failing intermittently
    Degraded,
    /// Backend is failing consistently
    Unavailable,
}

impl FromStr for BackendStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(BackendStatus::Available),
            "degraded" => Ok(BackendStatus::Degraded),
            "unavailable" => Ok(BackendStatus::Unavailable),
            _ => Err(format!(
                "Invalid status: {}. Use: available, degraded, unavailable",
                s
            )),
        }
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendStatus::Available => write!(f, "available"),
            BackendStatus::Degraded => write!(f, "degraded"),
            BackendStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Context and output length limits declared by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLimits {
    /// Maximum context window in tokens
    pub context_length: u32,
    /// Maximum output tokens (if limited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            context_length: 8192,
            max_output_tokens: None,
        }
    }
}

/// A model or tool server able to fulfill one or more capabilities.
///
/// Descriptors are values: the registry hands out copies and replaces the
/// stored descriptor wholesale on update.
///
/// # Examples
///
/// ```
/// use switchyard::registry::BackendDescriptor;
///
/// let backend = BackendDescriptor::new("gpt-4o", "openai")
///     .with_capabilities(["market_analysis", "summarization"])
///     .with_priority(10)
///     .with_reliability(0.98);
///
/// assert!(backend.supports("market_analysis"));
/// assert!(!backend.supports("sentiment_analysis"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Unique identifier
    pub id: String,
    /// Provider name (e.g., "openai", "anthropic", "local")
    pub provider: String,
    /// Capability identifiers this backend declares
    pub capabilities: BTreeSet<String>,
    /// Context/length limits
    pub limits: ContextLimits,
    /// Current operating status
    pub status: BackendStatus,
    /// Expected latency of one unit of work in milliseconds
    pub expected_latency_ms: u32,
    /// Cost per unit of work
    pub cost_per_unit: f64,
    /// Reliability score in [0, 1]
    pub reliability: f64,
    /// Priority score (higher = preferred)
    pub priority: i32,
}

impl BackendDescriptor {
    /// Create a descriptor with no capabilities and neutral scores.
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            capabilities: BTreeSet::new(),
            limits: ContextLimits::default(),
            status: BackendStatus::Available,
            expected_latency_ms: 1000,
            cost_per_unit: 0.0,
            reliability: 1.0,
            priority: 0,
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.reliability = reliability;
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u32) -> Self {
        self.expected_latency_ms = latency_ms;
        self
    }

    pub fn with_cost(mut self, cost_per_unit: f64) -> Self {
        self.cost_per_unit = cost_per_unit;
        self
    }

    pub fn with_limits(mut self, limits: ContextLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_status(mut self, status: BackendStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether this backend declares the given capability.
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidDescriptor {
            backend: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id cannot be empty"));
        }
        if !(0.0..=1.0).contains(&self.reliability) {
            return Err(invalid("reliability must be within [0, 1]"));
        }
        if !self.cost_per_unit.is_finite() || self.cost_per_unit < 0.0 {
            return Err(invalid("cost_per_unit must be a non-negative number"));
        }
        Ok(())
    }
}

/// Canonical ranking: priority desc, reliability desc, latency asc, id asc.
///
/// The id tiebreak makes this a strict total order over distinct backends.
pub fn rank_order(a: &BackendDescriptor, b: &BackendDescriptor) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.reliability.total_cmp(&a.reliability))
        .then_with(|| a.expected_latency_ms.cmp(&b.expected_latency_ms))
        .then_with(|| a.id.cmp(&b.id))
}

/// Partial update applied to a registered descriptor.
///
/// Status is deliberately absent: it only changes through health feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendPatch {
    pub provider: Option<String>,
    pub capabilities: Option<BTreeSet<String>>,
    pub limits: Option<ContextLimits>,
    pub expected_latency_ms: Option<u32>,
    pub cost_per_unit: Option<f64>,
    pub reliability: Option<f64>,
    pub priority: Option<i32>,
}

impl BackendPatch {
    /// Produce the replacement descriptor.
    pub fn apply(&self, base: &BackendDescriptor) -> BackendDescriptor {
        BackendDescriptor {
            id: base.id.clone(),
            provider: self.provider.clone().unwrap_or_else(|| base.provider.clone()),
            capabilities: self
                .capabilities
                .clone()
                .unwrap_or_else(|| base.capabilities.clone()),
            limits: self.limits.unwrap_or(base.limits),
            status: base.status,
            expected_latency_ms: self.expected_latency_ms.unwrap_or(base.expected_latency_ms),
            cost_per_unit: self.cost_per_unit.unwrap_or(base.cost_per_unit),
            reliability: self.reliability.unwrap_or(base.reliability),
            priority: self.priority.unwrap_or(base.priority),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &BackendPatch::default()
    }
}
