//! Output formatting helpers for CLI commands

use crate::admission::{AdmissionSnapshot, PoolStatus};
use crate::capability::CapabilityEntry;
use crate::dispatch::{AttemptOutcome, AttemptTrace};
use crate::registry::{BackendDescriptor, BackendStatus};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// View model for backend display
#[derive(Debug, Clone, serde::Serialize)]
pub struct BackendView {
    pub id: String,
    pub provider: String,
    pub status: BackendStatus,
    pub priority: i32,
    pub reliability: f64,
    pub expected_latency_ms: u32,
    pub cost_per_unit: f64,
    pub capabilities: Vec<String>,
}

impl From<&BackendDescriptor> for BackendView {
    fn from(backend: &BackendDescriptor) -> Self {
        Self {
            id: backend.id.clone(),
            provider: backend.provider.clone(),
            status: backend.status,
            priority: backend.priority,
            reliability: backend.reliability,
            expected_latency_ms: backend.expected_latency_ms,
            cost_per_unit: backend.cost_per_unit,
            capabilities: backend.capabilities.iter().cloned().collect(),
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn pretty_json(value: serde_json::Value) -> String {
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// Colored status label
pub fn status_label(status: BackendStatus) -> String {
    match status {
        BackendStatus::Available => "available".green().to_string(),
        BackendStatus::Degraded => "degraded".yellow().to_string(),
        BackendStatus::Unavailable => "unavailable".red().to_string(),
    }
}

/// Get status icon for backend status
pub fn status_icon(status: BackendStatus) -> &'static str {
    match status {
        BackendStatus::Available => "✓",
        BackendStatus::Degraded => "~",
        BackendStatus::Unavailable => "✗",
    }
}

/// Format backends as a table
pub fn format_backends_table(backends: &[BackendView]) -> String {
    let mut table = new_table(vec![
        "ID",
        "Provider",
        "Status",
        "Priority",
        "Reliability",
        "Latency",
        "Capabilities",
    ]);

    for b in backends {
        table.add_row(vec![
            Cell::new(&b.id),
            Cell::new(&b.provider),
            Cell::new(format!("{} {}", status_icon(b.status), status_label(b.status))),
            Cell::new(b.priority),
            Cell::new(format!("{:.2}", b.reliability)),
            Cell::new(format!("{}ms", b.expected_latency_ms)),
            Cell::new(b.capabilities.join(", ")),
        ]);
    }

    table.to_string()
}

/// Format backends as JSON
pub fn format_backends_json(backends: &[BackendView]) -> String {
    pretty_json(json!({ "backends": backends }))
}

/// Format capabilities as a table
pub fn format_capabilities_table(capabilities: &[CapabilityEntry]) -> String {
    let mut table = new_table(vec!["ID", "Name", "Active", "Fallbacks"]);

    for c in capabilities {
        let active = match &c.active_backend {
            Some(id) => id.bold().to_string(),
            None => "-".dimmed().to_string(),
        };
        table.add_row(vec![
            Cell::new(&c.id),
            Cell::new(&c.name),
            Cell::new(active),
            Cell::new(c.fallback_chain.join(" → ")),
        ]);
    }

    table.to_string()
}

/// Format capabilities as JSON
pub fn format_capabilities_json(capabilities: &[CapabilityEntry]) -> String {
    pretty_json(json!({ "capabilities": capabilities }))
}

/// Format admission state as a table
pub fn format_admission_table(snapshots: &[AdmissionSnapshot]) -> String {
    let mut table = new_table(vec!["Backend", "Rate Limit", "Window", "Pool", "Pool Status"]);

    for s in snapshots {
        let (limit, window) = match &s.rate_limit {
            Some(r) => {
                let count = format!("{}/{}", r.count, r.max_requests);
                let count = if r.throttled {
                    count.red().to_string()
                } else {
                    count
                };
                (count, format!("{}s", r.window_seconds))
            }
            None => ("unlimited".to_string(), "-".to_string()),
        };
        let (pool, status) = match &s.pool {
            Some(p) => {
                let status = match p.status {
                    PoolStatus::Active => "active".green().to_string(),
                    PoolStatus::Draining => "draining".yellow().to_string(),
                    PoolStatus::Closed => "closed".red().to_string(),
                };
                (
                    format!("{} active, {} idle / {}", p.active, p.idle, p.max_connections),
                    status,
                )
            }
            None => ("unlimited".to_string(), "-".to_string()),
        };
        table.add_row(vec![
            Cell::new(&s.backend_id),
            Cell::new(limit),
            Cell::new(window),
            Cell::new(pool),
            Cell::new(status),
        ]);
    }

    table.to_string()
}

/// Format admission state as JSON
pub fn format_admission_json(snapshots: &[AdmissionSnapshot]) -> String {
    pretty_json(json!({ "admission": snapshots }))
}

/// Format an attempt trace as a table
pub fn format_trace_table(trace: &AttemptTrace) -> String {
    let mut table = new_table(vec!["#", "Backend", "Outcome", "Latency", "Detail"]);

    for (i, attempt) in trace.iter().enumerate() {
        let outcome = match attempt.outcome {
            AttemptOutcome::Success => attempt.outcome.as_str().green().to_string(),
            AttemptOutcome::RateLimited | AttemptOutcome::PoolExhausted => {
                attempt.outcome.as_str().yellow().to_string()
            }
            AttemptOutcome::Failure | AttemptOutcome::Timeout => {
                attempt.outcome.as_str().red().to_string()
            }
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&attempt.backend_id),
            Cell::new(outcome),
            Cell::new(format!("{}ms", attempt.latency_ms)),
            Cell::new(attempt.detail.as_deref().unwrap_or("")),
        ]);
    }

    table.to_string()
}
