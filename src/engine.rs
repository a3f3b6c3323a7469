//! Engine facade.
//!
//! [`Engine`] owns every component and is the single entry point for the
//! presentation layer: snapshot queries are open, every mutation is gated on
//! `mcp_settings/write` and leaves two audit records behind (the
//! authorization decision and the mutation outcome).

use crate::admission::{
    AdmissionControl, AdmissionError, AdmissionSnapshot, PoolStatus, RateLimit,
};
use crate::capability::{CapabilityEntry, CapabilityError, CapabilityTable};
use crate::config::{AdmissionConfig, BackendConfig, ConfigError, SwitchyardConfig};
use crate::dispatch::{
    DispatchError, DispatchRequest, DispatchSuccess, Dispatcher, ExecutionTransport,
};
use crate::health::HealthMonitor;
use crate::policy::{
    Action, Actor, Decision, PermissionModel, PolicyEngine, PolicyError, SETTINGS_RESOURCE,
};
use crate::registry::{BackendDescriptor, BackendPatch, Registry, RegistryError};
use crate::telemetry::{
    AuditFanout, AuditOutcome, AuditRecord, AuditSink, MemoryAuditLog, MetricsSink, Severity,
    TelemetryFanout, TelemetrySink, TracingAuditSink, TracingSink,
};
use std::sync::Arc;
use std::time::Duration;

/// Errors surfaced by the engine facade.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Capability orchestration engine.
pub struct Engine {
    registry: Arc<Registry>,
    capabilities: Arc<CapabilityTable>,
    admission: Arc<AdmissionControl>,
    policy: Arc<PolicyEngine>,
    health: Arc<HealthMonitor>,
    dispatcher: Dispatcher,
    audit_log: Arc<MemoryAuditLog>,
    audit: Arc<dyn AuditSink>,
    admission_defaults: AdmissionConfig,
}

impl Engine {
    /// Build an engine with the default sinks: tracing and Prometheus for
    /// telemetry, tracing plus the in-memory log for audit.
    pub fn from_config(
        config: &SwitchyardConfig,
        transport: Arc<dyn ExecutionTransport>,
    ) -> Result<Self, EngineError> {
        let telemetry = TelemetryFanout::new()
            .with(Arc::new(TracingSink))
            .with(Arc::new(MetricsSink::new()));
        Self::new(
            config,
            transport,
            Arc::new(telemetry),
            Arc::new(TracingAuditSink),
        )
    }

    /// Build an engine from validated configuration.
    ///
    /// Nothing is applied unless the whole configuration validates. `audit`
    /// receives every record in addition to the in-memory log behind
    /// [`recent_audit`](Self::recent_audit).
    pub fn new(
        config: &SwitchyardConfig,
        transport: Arc<dyn ExecutionTransport>,
        telemetry: Arc<dyn TelemetrySink>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let registry = Arc::new(Registry::new());
        let capabilities = Arc::new(CapabilityTable::new(Arc::clone(&registry)));
        let admission = Arc::new(AdmissionControl::new());
        let policy = Arc::new(PolicyEngine::new());
        let health = Arc::new(HealthMonitor::new(
            Arc::clone(&registry),
            config.health.clone(),
        ));
        let audit_log = Arc::new(MemoryAuditLog::new(config.server.audit_capacity));
        let audit: Arc<dyn AuditSink> = Arc::new(
            AuditFanout::new()
                .with(Arc::clone(&audit_log) as Arc<dyn AuditSink>)
                .with(audit),
        );

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&capabilities),
            Arc::clone(&admission),
            Arc::clone(&policy),
            transport,
        )
        .with_config(config.dispatch.clone())
        .with_telemetry(telemetry)
        .with_audit(Arc::clone(&audit))
        .with_health(Arc::clone(&health));

        let engine = Self {
            registry,
            capabilities,
            admission,
            policy,
            health,
            dispatcher,
            audit_log,
            audit,
            admission_defaults: config.admission.clone(),
        };
        engine.load(config)?;

        tracing::info!(
            backends = engine.registry.backend_count(),
            capabilities = engine.capabilities.len(),
            active_model = ?engine.policy.active_model().map(|m| m.id),
            "Engine initialized"
        );
        Ok(engine)
    }

    /// Apply backends, admission, capabilities and policy in dependency order.
    fn load(&self, config: &SwitchyardConfig) -> Result<(), EngineError> {
        for backend in &config.backends {
            self.install_backend(backend)?;
        }

        for capability in &config.capabilities {
            self.capabilities.define(
                &capability.id,
                capability.display_name(),
                &capability.description,
            )?;
            if capability.auto_rank {
                self.capabilities.auto_rank(&capability.id)?;
                continue;
            }
            if let Some(active) = &capability.active {
                self.capabilities.set_active(&capability.id, active)?;
            }
            if !capability.fallbacks.is_empty() {
                self.capabilities
                    .set_fallback_chain(&capability.id, capability.fallbacks.clone())?;
            }
        }

        for model in &config.policy.models {
            self.policy.define(model.clone())?;
        }
        if let Some(id) = config.policy.startup_model() {
            self.policy.activate(id)?;
        }
        Ok(())
    }

    fn install_backend(&self, backend: &BackendConfig) -> Result<BackendDescriptor, EngineError> {
        let descriptor = backend.to_descriptor();
        if let Some(limit) = backend.rate_limit {
            limit.validate()?;
        }
        self.registry.register(descriptor.clone())?;
        self.admission.install(
            &backend.id,
            backend
                .rate_limit
                .or(self.admission_defaults.default_rate_limit),
            backend
                .max_connections
                .or(self.admission_defaults.default_max_connections),
        );
        self.dispatcher.set_timeout_override(
            &backend.id,
            backend.timeout_ms.map(Duration::from_millis),
        );
        Ok(descriptor)
    }

    /// Authorize `actor` for an administrative mutation, run it, and audit
    /// both the decision and the outcome.
    fn administer<T>(
        &self,
        actor: &Actor,
        action: &str,
        resource: &str,
        severity: Severity,
        mutation: impl FnOnce() -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let decision = self
            .policy
            .authorize(&actor.role, SETTINGS_RESOURCE, Action::Write);
        metrics::counter!("switchyard_authorization_total", "decision" => decision.to_string())
            .increment(1);

        let authorization = match decision {
            Decision::Allow => AuditOutcome::Allowed,
            Decision::Deny => AuditOutcome::Denied,
        };
        self.audit.record(
            AuditRecord::new(&actor.id, "write", SETTINGS_RESOURCE, authorization)
                .with_detail(format!("role '{}' requested {} on '{}'", actor.role, action, resource))
                .with_tag("authorization")
                .with_tag("admin"),
        );
        if decision == Decision::Deny {
            tracing::warn!(
                actor = %actor.id,
                role = %actor.role,
                action = %action,
                resource = %resource,
                "Administrative change denied"
            );
            return Err(PolicyError::PermissionDenied {
                role: actor.role.clone(),
                resource: SETTINGS_RESOURCE.to_string(),
                action: Action::Write,
            }
            .into());
        }

        let result = mutation();
        let record = match &result {
            Ok(_) => {
                tracing::info!(
                    actor = %actor.id,
                    action = %action,
                    resource = %resource,
                    "Configuration changed"
                );
                AuditRecord::new(&actor.id, action, resource, AuditOutcome::Succeeded)
                    .with_severity(severity)
            }
            Err(err) => AuditRecord::new(&actor.id, action, resource, AuditOutcome::Failed)
                .with_detail(err.to_string()),
        };
        self.audit
            .record(record.with_tag("configuration").with_tag("admin"));
        result
    }

    // ---- Commands ----

    /// Register a backend together with its admission limits and timeout.
    pub fn register_backend(
        &self,
        actor: &Actor,
        backend: &BackendConfig,
    ) -> Result<BackendDescriptor, EngineError> {
        self.administer(actor, "register_backend", &backend.id, Severity::Info, || {
            self.install_backend(backend)
        })
    }

    pub fn update_backend(
        &self,
        actor: &Actor,
        id: &str,
        patch: &BackendPatch,
    ) -> Result<BackendDescriptor, EngineError> {
        self.administer(actor, "update_backend", id, Severity::Info, || {
            Ok(self.registry.update(id, patch)?)
        })
    }

    /// Remove a backend and every piece of per-backend state.
    ///
    /// Fails with `BackendInUse` while any capability still references it.
    pub fn deregister_backend(
        &self,
        actor: &Actor,
        id: &str,
    ) -> Result<BackendDescriptor, EngineError> {
        self.administer(actor, "deregister_backend", id, Severity::Warning, || {
            let removed = self.registry.deregister(id)?;
            self.admission.remove(id);
            self.health.forget(id);
            self.dispatcher.set_timeout_override(id, None);
            Ok(removed)
        })
    }

    pub fn define_capability(
        &self,
        actor: &Actor,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<CapabilityEntry, EngineError> {
        self.administer(actor, "define_capability", id, Severity::Info, || {
            Ok(self.capabilities.define(id, name, description)?)
        })
    }

    pub fn undefine_capability(
        &self,
        actor: &Actor,
        id: &str,
    ) -> Result<CapabilityEntry, EngineError> {
        self.administer(actor, "undefine_capability", id, Severity::Warning, || {
            Ok(self.capabilities.undefine(id)?)
        })
    }

    /// Select the model serving `capability`.
    pub fn set_active(
        &self,
        actor: &Actor,
        capability: &str,
        backend: &str,
    ) -> Result<CapabilityEntry, EngineError> {
        self.administer(actor, "set_active", capability, Severity::Info, || {
            Ok(self.capabilities.set_active(capability, backend)?)
        })
    }

    pub fn set_fallback_chain(
        &self,
        actor: &Actor,
        capability: &str,
        chain: Vec<String>,
    ) -> Result<CapabilityEntry, EngineError> {
        self.administer(actor, "set_fallback_chain", capability, Severity::Info, || {
            Ok(self.capabilities.set_fallback_chain(capability, chain)?)
        })
    }

    pub fn auto_rank(&self, actor: &Actor, capability: &str) -> Result<CapabilityEntry, EngineError> {
        self.administer(actor, "auto_rank", capability, Severity::Info, || {
            Ok(self.capabilities.auto_rank(capability)?)
        })
    }

    /// Change the rate limit for `backend`.
    ///
    /// `window_seconds` defaults to the backend's current window. A backend
    /// without a limiter gets one, using the configured default window (60s
    /// when no default is configured).
    pub fn set_rate_limit(
        &self,
        actor: &Actor,
        backend: &str,
        max_requests: u32,
        window_seconds: Option<u64>,
    ) -> Result<(), EngineError> {
        self.administer(actor, "set_rate_limit", backend, Severity::Info, || {
            if !self.registry.contains(backend) {
                return Err(RegistryError::UnknownBackend(backend.to_string()).into());
            }
            let limiter = self.admission.limiter();
            let current = limiter.snapshot(backend);
            let window_seconds = window_seconds.unwrap_or_else(|| match &current {
                Some(snapshot) => snapshot.window_seconds,
                None => {
                    self.admission_defaults
                        .default_rate_limit
                        .unwrap_or_default()
                        .window_seconds
                }
            });
            let limit = RateLimit::new(max_requests, window_seconds);
            limit.validate()?;
            if current.is_some() {
                limiter.set_limit(backend, limit)?;
            } else {
                limiter.install(backend, limit);
            }
            Ok(())
        })
    }

    pub fn reset_rate_limit(&self, actor: &Actor, backend: &str) -> Result<(), EngineError> {
        self.administer(actor, "reset_rate_limit", backend, Severity::Info, || {
            Ok(self.admission.limiter().reset(backend)?)
        })
    }

    pub fn drain_pool(&self, actor: &Actor, backend: &str) -> Result<PoolStatus, EngineError> {
        self.administer(actor, "drain_pool", backend, Severity::Warning, || {
            Ok(self.admission.pools().drain(backend)?)
        })
    }

    pub fn activate_pool(&self, actor: &Actor, backend: &str) -> Result<PoolStatus, EngineError> {
        self.administer(actor, "activate_pool", backend, Severity::Info, || {
            Ok(self.admission.pools().activate(backend)?)
        })
    }

    /// Define or replace a permission model.
    pub fn define_permission_model(
        &self,
        actor: &Actor,
        model: PermissionModel,
    ) -> Result<(), EngineError> {
        let id = model.id.clone();
        self.administer(actor, "define_permission_model", &id, Severity::Critical, || {
            Ok(self.policy.define(model)?)
        })
    }

    pub fn activate_permission_model(&self, actor: &Actor, id: &str) -> Result<(), EngineError> {
        self.administer(actor, "activate_permission_model", id, Severity::Critical, || {
            Ok(self.policy.activate(id)?)
        })
    }

    // ---- Dispatch ----

    pub async fn dispatch(
        &self,
        request: DispatchRequest,
    ) -> Result<DispatchSuccess, DispatchError> {
        self.dispatcher.dispatch(request).await
    }

    // ---- Snapshots ----

    /// All backends in canonical rank order.
    pub fn backends(&self) -> Vec<BackendDescriptor> {
        self.registry.list()
    }

    pub fn backend(&self, id: &str) -> Option<BackendDescriptor> {
        self.registry.get(id)
    }

    pub fn capabilities(&self) -> Vec<CapabilityEntry> {
        self.capabilities.list()
    }

    pub fn capability(&self, id: &str) -> Option<CapabilityEntry> {
        self.capabilities.get(id)
    }

    pub fn admission_status(&self) -> Vec<AdmissionSnapshot> {
        self.admission.status()
    }

    pub fn permission_models(&self) -> Vec<PermissionModel> {
        self.policy.models()
    }

    pub fn active_permission_model(&self) -> Option<PermissionModel> {
        self.policy.active_model()
    }

    /// Most recent audit records, newest first.
    pub fn recent_audit(&self, limit: usize) -> Vec<AuditRecord> {
        self.audit_log.recent(limit)
    }

    // ---- Component access ----

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn capability_table(&self) -> &Arc<CapabilityTable> {
        &self.capabilities
    }

    pub fn admission(&self) -> &Arc<AdmissionControl> {
        &self.admission
    }

    pub fn policy(&self) -> &Arc<PolicyEngine> {
        &self.policy
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapabilityConfig;
    use crate::dispatch::NullTransport;
    use crate::policy::Grant;
    use crate::telemetry::MemoryTelemetry;

    fn admin() -> Actor {
        Actor::new("root", "admin")
    }

    fn viewer() -> Actor {
        Actor::new("guest", "viewer")
    }

    fn backend(id: &str, priority: i32) -> BackendConfig {
        BackendConfig {
            priority,
            ..toml::from_str(&format!(
                "id = \"{id}\"\nprovider = \"test\"\ncapabilities = [\"summarize\"]"
            ))
            .unwrap()
        }
    }

    fn config() -> SwitchyardConfig {
        let mut config = SwitchyardConfig::default();
        config.backends = vec![backend("b1", 5), backend("b2", 1)];
        config.capabilities = vec![CapabilityConfig {
            id: "summarize".to_string(),
            auto_rank: true,
            ..toml::from_str("id = \"summarize\"").unwrap()
        }];
        config.policy.models = vec![PermissionModel::new("default")
            .with_roles(["admin", "viewer"])
            .with_resources(["summarize", SETTINGS_RESOURCE])
            .with_grant(Grant::new(
                "admin",
                "*",
                [Action::Read, Action::Write, Action::Execute],
            ))
            .with_grant(Grant::new("viewer", "summarize", [Action::Read]))];
        config
    }

    fn engine() -> Engine {
        Engine::new(
            &config(),
            Arc::new(NullTransport),
            Arc::new(MemoryTelemetry::new()),
            Arc::new(AuditFanout::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_from_config_applies_auto_rank_and_single_model() {
        let engine = engine();
        let entry = engine.capability("summarize").unwrap();

        assert_eq!(entry.active_backend.as_deref(), Some("b1"));
        assert_eq!(entry.fallback_chain, vec!["b2".to_string()]);
        assert_eq!(engine.active_permission_model().unwrap().id, "default");
    }

    #[test]
    fn test_invalid_config_applies_nothing() {
        let mut config = config();
        config.capabilities[0].auto_rank = false;
        config.capabilities[0].active = Some("missing".to_string());

        let result = Engine::from_config(&config, Arc::new(NullTransport));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_admin_command_denied_for_viewer() {
        let engine = engine();

        let result = engine.set_active(&viewer(), "summarize", "b2");

        assert!(matches!(
            result,
            Err(EngineError::Policy(PolicyError::PermissionDenied { .. }))
        ));
        assert_eq!(
            engine.capability("summarize").unwrap().active_backend.as_deref(),
            Some("b1")
        );
        let audit = engine.recent_audit(10);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].outcome, AuditOutcome::Denied);
    }

    #[test]
    fn test_admin_command_writes_two_audit_records() {
        let engine = engine();

        let entry = engine.set_active(&admin(), "summarize", "b2").unwrap();
        assert_eq!(entry.active_backend.as_deref(), Some("b2"));
        assert_eq!(entry.fallback_chain, vec!["b1".to_string()]);

        let audit = engine.recent_audit(10);
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].outcome, AuditOutcome::Succeeded);
        assert_eq!(audit[0].action, "set_active");
        assert_eq!(audit[1].outcome, AuditOutcome::Allowed);
    }

    #[test]
    fn test_failed_mutation_is_audited_as_failed() {
        let engine = engine();

        let result = engine.deregister_backend(&admin(), "b1");
        assert!(matches!(
            result,
            Err(EngineError::Registry(RegistryError::BackendInUse { .. }))
        ));
        assert_eq!(engine.recent_audit(1)[0].outcome, AuditOutcome::Failed);
    }

    #[test]
    fn test_set_rate_limit_installs_missing_limiter() {
        let engine = engine();
        assert!(engine.admission().limiter().snapshot("b1").is_none());

        engine.set_rate_limit(&admin(), "b1", 5, None).unwrap();

        let snapshot = engine.admission().limiter().snapshot("b1").unwrap();
        assert_eq!(snapshot.max_requests, 5);
        assert_eq!(snapshot.window_seconds, 60);
    }

    #[test]
    fn test_set_rate_limit_rejects_zero_window() {
        let engine = engine();
        engine.set_rate_limit(&admin(), "b1", 5, Some(30)).unwrap();

        let result = engine.set_rate_limit(&admin(), "b1", 5, Some(0));
        assert!(matches!(
            result,
            Err(EngineError::Admission(AdmissionError::InvalidRateLimit(_)))
        ));
        let snapshot = engine.admission().limiter().snapshot("b1").unwrap();
        assert_eq!(snapshot.window_seconds, 30);
        assert_eq!(engine.recent_audit(1)[0].outcome, AuditOutcome::Failed);
    }

    #[test]
    fn test_register_backend_rejects_zero_window() {
        let engine = engine();
        let mut edge = backend("edge", 1);
        edge.rate_limit = Some(RateLimit::new(10, 0));

        let result = engine.register_backend(&admin(), &edge);
        assert!(matches!(
            result,
            Err(EngineError::Admission(AdmissionError::InvalidRateLimit(_)))
        ));
        assert!(engine.backend("edge").is_none());
    }

    #[test]
    fn test_set_rate_limit_unknown_backend() {
        let engine = engine();
        let result = engine.set_rate_limit(&admin(), "ghost", 5, None);
        assert!(matches!(
            result,
            Err(EngineError::Registry(RegistryError::UnknownBackend(_)))
        ));
    }

    #[test]
    fn test_deregister_after_unassigning() {
        let engine = engine();
        engine
            .set_fallback_chain(&admin(), "summarize", Vec::new())
            .unwrap();

        let removed = engine.deregister_backend(&admin(), "b2").unwrap();
        assert_eq!(removed.id, "b2");
        assert!(engine.backend("b2").is_none());
    }
}
