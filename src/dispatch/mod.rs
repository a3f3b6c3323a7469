//! Dispatcher module.
//!
//! Drives one request through a capability's candidates:
//!
//! ```text
//! Authorizing -> Admitting(B) -> Executing(B) -> Success
//!                     |               |
//!                     +--> Retrying <-+--> Exhausted
//! ```
//!
//! Attempts within a dispatch are strictly sequential and the candidate list
//! is read once from a capability snapshot. The only suspension point is the
//! bounded wait on the transport.

mod error;
mod trace;
mod transport;

pub use error::*;
pub use trace::*;
pub use transport::*;

use crate::admission::{AdmissionControl, AdmissionError};
use crate::capability::CapabilityTable;
use crate::config::DispatchConfig;
use crate::health::HealthMonitor;
use crate::policy::{Action, Actor, Decision, PolicyEngine};
use crate::registry::Registry;
use crate::telemetry::{
    AttemptEvent, AuditFanout, AuditOutcome, AuditRecord, AuditSink, DispatchOutcome,
    DispatchSpan, DispatchSummary, TelemetryFanout, TelemetrySink,
};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A request to execute one capability.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub capability: String,
    pub actor: Actor,
    pub payload: Value,
    /// Overrides the configured overall deadline
    pub deadline: Option<Duration>,
    pub cancel: CancellationToken,
}

impl DispatchRequest {
    pub fn new(capability: impl Into<String>, actor: Actor) -> Self {
        Self {
            capability: capability.into(),
            actor,
            payload: Value::Null,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSuccess {
    pub dispatch_id: Uuid,
    pub capability: String,
    pub backend_id: String,
    pub output: Value,
    pub trace: AttemptTrace,
}

/// States of a single dispatch, logged at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState<'a> {
    Authorizing,
    Admitting(&'a str),
    Executing(&'a str),
    Retrying,
    Success,
    Exhausted,
}

/// Routes capability requests through ranked candidates with fallback.
pub struct Dispatcher {
    registry: Arc<Registry>,
    capabilities: Arc<CapabilityTable>,
    admission: Arc<AdmissionControl>,
    policy: Arc<PolicyEngine>,
    transport: Arc<dyn ExecutionTransport>,
    telemetry: Arc<dyn TelemetrySink>,
    audit: Arc<dyn AuditSink>,
    health: Option<Arc<HealthMonitor>>,
    config: DispatchConfig,
    /// Per-backend attempt timeouts overriding the latency-derived value
    timeouts: DashMap<String, Duration>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        capabilities: Arc<CapabilityTable>,
        admission: Arc<AdmissionControl>,
        policy: Arc<PolicyEngine>,
        transport: Arc<dyn ExecutionTransport>,
    ) -> Self {
        Self {
            registry,
            capabilities,
            admission,
            policy,
            transport,
            telemetry: Arc::new(TelemetryFanout::new()),
            audit: Arc::new(AuditFanout::new()),
            health: None,
            config: DispatchConfig::default(),
            timeouts: DashMap::new(),
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_health(mut self, health: Arc<HealthMonitor>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Pin the attempt timeout for one backend. `None` restores the derived value.
    pub fn set_timeout_override(&self, backend: &str, timeout: Option<Duration>) {
        match timeout {
            Some(t) => {
                self.timeouts.insert(backend.to_string(), t);
            }
            None => {
                self.timeouts.remove(backend);
            }
        }
    }

    /// Attempt timeout for `backend`, or `None` if it is no longer registered.
    pub fn timeout_for(&self, backend: &str) -> Option<Duration> {
        let descriptor = self.registry.get(backend)?;
        let derived = self.config.timeout_for_latency(descriptor.expected_latency_ms);
        Some(
            self.timeouts
                .get(backend)
                .map(|t| *t.value())
                .unwrap_or(derived),
        )
    }

    fn transition(&self, dispatch_id: &Uuid, state: DispatchState<'_>) {
        tracing::trace!(dispatch_id = %dispatch_id, state = ?state, "Dispatch state");
    }

    /// Execute `request` against its capability's candidates in order.
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
    ) -> Result<DispatchSuccess, DispatchError> {
        let dispatch_id = Uuid::new_v4();
        let started = Instant::now();
        let capability = request.capability.clone();

        self.telemetry.dispatch_started(&DispatchSpan {
            dispatch_id,
            capability: capability.clone(),
            actor_id: request.actor.id.clone(),
            started_at: chrono::Utc::now(),
        });

        let finish = |outcome: DispatchOutcome, backend_id: Option<String>, attempts: usize| {
            self.telemetry.dispatch_finished(&DispatchSummary {
                dispatch_id,
                capability: capability.clone(),
                outcome,
                backend_id,
                attempts,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        };

        // Authorizing
        self.transition(&dispatch_id, DispatchState::Authorizing);
        let decision = self
            .policy
            .authorize(&request.actor.role, &capability, Action::Execute);
        self.audit_authorization(&request.actor, &capability, decision);
        if decision == Decision::Deny {
            finish(DispatchOutcome::PermissionDenied, None, 0);
            return Err(DispatchError::PermissionDenied {
                role: request.actor.role.clone(),
                capability,
            });
        }

        let entry = match self.capabilities.snapshot(&capability) {
            Ok(entry) => entry,
            Err(_) => {
                finish(DispatchOutcome::CapabilityNotFound, None, 0);
                return Err(DispatchError::CapabilityNotFound(capability));
            }
        };
        let candidates = entry.candidates();
        if candidates.is_empty() {
            finish(DispatchOutcome::NoCandidates, None, 0);
            return Err(DispatchError::NoCandidates(capability));
        }

        let deadline = request
            .deadline
            .or_else(|| self.config.overall_deadline())
            // A budget past the clock's range means no deadline
            .and_then(|budget| started.checked_add(budget));
        let mut trace = AttemptTrace::new();

        for backend in &candidates {
            if request.cancel.is_cancelled() {
                tracing::debug!(
                    dispatch_id = %dispatch_id,
                    capability = %capability,
                    attempts = trace.len(),
                    "Dispatch cancelled"
                );
                finish(DispatchOutcome::Cancelled, None, trace.len());
                return Err(DispatchError::Cancelled { capability, trace });
            }

            let Some(timeout) = self.timeout_for(backend) else {
                self.record(
                    &mut trace,
                    &dispatch_id,
                    &capability,
                    backend,
                    AttemptOutcome::Failure,
                    0,
                    Some("backend is no longer registered".to_string()),
                );
                continue;
            };

            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining < timeout {
                    tracing::debug!(
                        dispatch_id = %dispatch_id,
                        capability = %capability,
                        backend_id = %backend,
                        remaining_ms = remaining.as_millis() as u64,
                        timeout_ms = timeout.as_millis() as u64,
                        "Deadline too close for next attempt"
                    );
                    break;
                }
            }

            // Admitting
            self.transition(&dispatch_id, DispatchState::Admitting(backend));
            let permit = match self.admission.admit(backend) {
                Ok(permit) => permit,
                Err(err) => {
                    let outcome = match err {
                        AdmissionError::RateLimited { .. } => AttemptOutcome::RateLimited,
                        _ => AttemptOutcome::PoolExhausted,
                    };
                    self.record(
                        &mut trace,
                        &dispatch_id,
                        &capability,
                        backend,
                        outcome,
                        0,
                        Some(err.to_string()),
                    );
                    self.transition(&dispatch_id, DispatchState::Retrying);
                    continue;
                }
            };

            // Executing
            self.transition(&dispatch_id, DispatchState::Executing(backend));
            let attempt_start = Instant::now();
            let result = tokio::time::timeout(
                timeout,
                self.transport.execute(backend, &request.payload, timeout),
            )
            .await;
            drop(permit);
            let latency_ms = attempt_start.elapsed().as_millis() as u64;

            let (outcome, detail) = match result {
                Ok(Ok(output)) => {
                    self.record(
                        &mut trace,
                        &dispatch_id,
                        &capability,
                        backend,
                        AttemptOutcome::Success,
                        latency_ms,
                        None,
                    );
                    self.feed_health(backend, true);
                    self.transition(&dispatch_id, DispatchState::Success);
                    finish(
                        DispatchOutcome::Success,
                        Some(backend.clone()),
                        trace.len(),
                    );
                    return Ok(DispatchSuccess {
                        dispatch_id,
                        capability,
                        backend_id: backend.clone(),
                        output,
                        trace,
                    });
                }
                Ok(Err(TransportError::Timeout { .. })) => (AttemptOutcome::Timeout, None),
                Ok(Err(err)) => (AttemptOutcome::Failure, Some(err.to_string())),
                Err(_elapsed) => (
                    AttemptOutcome::Timeout,
                    Some(format!("no reply within {}ms", timeout.as_millis())),
                ),
            };

            self.record(
                &mut trace,
                &dispatch_id,
                &capability,
                backend,
                outcome,
                latency_ms,
                detail,
            );
            self.feed_health(backend, false);
            self.transition(&dispatch_id, DispatchState::Retrying);
        }

        self.transition(&dispatch_id, DispatchState::Exhausted);
        finish(DispatchOutcome::Exhausted, None, trace.len());
        Err(DispatchError::AllFallbacksExhausted { capability, trace })
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        trace: &mut AttemptTrace,
        dispatch_id: &Uuid,
        capability: &str,
        backend: &str,
        outcome: AttemptOutcome,
        latency_ms: u64,
        detail: Option<String>,
    ) {
        self.telemetry.attempt_recorded(&AttemptEvent {
            dispatch_id: *dispatch_id,
            capability: capability.to_string(),
            backend_id: backend.to_string(),
            outcome,
            latency_ms,
        });
        trace.push(Attempt {
            backend_id: backend.to_string(),
            outcome,
            latency_ms,
            detail,
        });
    }

    fn feed_health(&self, backend: &str, success: bool) {
        if let Some(health) = &self.health {
            health.record(backend, success);
        }
    }

    fn audit_authorization(&self, actor: &Actor, capability: &str, decision: Decision) {
        metrics::counter!("switchyard_authorization_total", "decision" => decision.to_string())
            .increment(1);

        let outcome = match decision {
            Decision::Allow => AuditOutcome::Allowed,
            Decision::Deny => AuditOutcome::Denied,
        };
        self.audit.record(
            AuditRecord::new(&actor.id, "execute", capability, outcome)
                .with_detail(format!("role '{}'", actor.role))
                .with_tag("authorization")
                .with_tag("dispatch"),
        );
    }
}
