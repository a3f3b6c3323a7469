use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Allowed,
    Denied,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One authorization decision or administrative mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub outcome: AuditOutcome,
    pub severity: Severity,
    pub detail: String,
    pub tags: BTreeSet<String>,
}

impl AuditRecord {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        let severity = match outcome {
            AuditOutcome::Allowed | AuditOutcome::Succeeded => Severity::Info,
            AuditOutcome::Denied | AuditOutcome::Failed => Severity::Warning,
        };
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: actor.into(),
            action: action.into(),
            resource: resource.into(),
            outcome,
            severity,
            detail: String::new(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Best-effort audit trail.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Bounded in-memory audit log. The oldest record is evicted when full.
pub struct MemoryAuditLog {
    capacity: usize,
    records: Mutex<VecDeque<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Up to `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        self.records
            .lock()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, record: AuditRecord) {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }
}

/// Writes audit records to the log under the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        match record.severity {
            Severity::Info => tracing::info!(
                target: "audit",
                actor = %record.actor,
                action = %record.action,
                resource = %record.resource,
                outcome = ?record.outcome,
                detail = %record.detail,
                "Audit"
            ),
            Severity::Warning | Severity::Critical => tracing::warn!(
                target: "audit",
                actor = %record.actor,
                action = %record.action,
                resource = %record.resource,
                outcome = ?record.outcome,
                severity = ?record.severity,
                detail = %record.detail,
                "Audit"
            ),
        }
    }
}

/// Forwards every record to each inner sink.
#[derive(Default, Clone)]
pub struct AuditFanout {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl AuditSink for AuditFanout {
    fn record(&self, record: AuditRecord) {
        for sink in &self.sinks {
            sink.record(record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_evicts_oldest() {
        let log = MemoryAuditLog::new(2);
        for action in ["first", "second", "third"] {
            log.record(AuditRecord::new("u1", action, "r", AuditOutcome::Succeeded));
        }

        let recent = log.recent(10);
        assert_eq!(log.len(), 2);
        assert_eq!(recent[0].action, "third");
        assert_eq!(recent[1].action, "second");
    }

    #[test]
    fn test_default_severity_follows_outcome() {
        let allowed = AuditRecord::new("u", "a", "r", AuditOutcome::Allowed);
        let denied = AuditRecord::new("u", "a", "r", AuditOutcome::Denied);
        assert_eq!(allowed.severity, Severity::Info);
        assert_eq!(denied.severity, Severity::Warning);
    }

    #[test]
    fn test_fanout_delivers_to_all() {
        let a = Arc::new(MemoryAuditLog::default());
        let b = Arc::new(MemoryAuditLog::default());
        let fanout = AuditFanout::new()
            .with(a.clone() as Arc<dyn AuditSink>)
            .with(b.clone() as Arc<dyn AuditSink>);

        fanout.record(
            AuditRecord::new("u", "set_active", "market_analysis", AuditOutcome::Succeeded)
                .with_tag("capability"),
        );

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert!(b.recent(1)[0].tags.contains("capability"));
    }
}
