//! Telemetry and audit sink contracts.
//!
//! Sinks are fire-and-forget: calls are infallible and must not block, so a
//! slow or broken sink can never gate a dispatch.
//!
//! Built-in sinks:
//! - [`TracingSink`] logs every event through `tracing`
//! - [`MetricsSink`] records Prometheus counters and histograms
//! - [`MemoryTelemetry`] keeps events in memory for tests and the CLI simulator
//! - [`MemoryAuditLog`] keeps the most recent audit records for `GET /v1/audit`

mod audit;
mod memory;
mod metrics_sink;
mod tracing_sink;

pub use audit::*;
pub use memory::*;
pub use metrics_sink::*;
pub use tracing_sink::*;

use crate::dispatch::AttemptOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Opened when a dispatch starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSpan {
    pub dispatch_id: Uuid,
    pub capability: String,
    pub actor_id: String,
    pub started_at: DateTime<Utc>,
}

/// One per attempt, emitted as soon as the attempt settles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptEvent {
    pub dispatch_id: Uuid,
    pub capability: String,
    pub backend_id: String,
    pub outcome: AttemptOutcome,
    pub latency_ms: u64,
}

/// Terminal state of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Success,
    PermissionDenied,
    CapabilityNotFound,
    NoCandidates,
    Exhausted,
    Cancelled,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Success => "success",
            DispatchOutcome::PermissionDenied => "permission_denied",
            DispatchOutcome::CapabilityNotFound => "capability_not_found",
            DispatchOutcome::NoCandidates => "no_candidates",
            DispatchOutcome::Exhausted => "exhausted",
            DispatchOutcome::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closes the span opened by [`DispatchSpan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub dispatch_id: Uuid,
    pub capability: String,
    pub outcome: DispatchOutcome,
    /// Backend that served the request on success
    pub backend_id: Option<String>,
    pub attempts: usize,
    pub duration_ms: u64,
}

/// Receiver for dispatch lifecycle events.
pub trait TelemetrySink: Send + Sync {
    fn dispatch_started(&self, span: &DispatchSpan);
    fn attempt_recorded(&self, event: &AttemptEvent);
    fn dispatch_finished(&self, summary: &DispatchSummary);
}

/// Forwards every event to each inner sink in order.
#[derive(Default, Clone)]
pub struct TelemetryFanout {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl TelemetryFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl TelemetrySink for TelemetryFanout {
    fn dispatch_started(&self, span: &DispatchSpan) {
        for sink in &self.sinks {
            sink.dispatch_started(span);
        }
    }

    fn attempt_recorded(&self, event: &AttemptEvent) {
        for sink in &self.sinks {
            sink.attempt_recorded(event);
        }
    }

    fn dispatch_finished(&self, summary: &DispatchSummary) {
        for sink in &self.sinks {
            sink.dispatch_finished(summary);
        }
    }
}
