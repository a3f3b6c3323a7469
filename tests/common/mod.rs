//! Shared test utilities for Switchyard integration tests.
//!
//! Provides a small fleet configuration, actors and engine builders wired to
//! the scripted transport and in-memory sinks.

#![allow(dead_code)]

use std::sync::Arc;
use switchyard::api::{create_router, AppState};
use switchyard::config::SwitchyardConfig;
use switchyard::dispatch::ScriptedTransport;
use switchyard::engine::Engine;
use switchyard::policy::Actor;
use switchyard::telemetry::{MemoryAuditLog, MemoryTelemetry};

/// Three backends, two capabilities and one permission model.
///
/// Attempt timeouts (latency × 2): primary 200ms, secondary 400ms, local 1000ms.
pub const FLEET_CONFIG: &str = r#"
[dispatch]
timeout_multiplier = 2.0
min_timeout_ms = 10
max_timeout_ms = 10000

[[backends]]
id = "primary"
provider = "anthropic"
capabilities = ["market_analysis", "summarization"]
expected_latency_ms = 100
reliability = 0.99
priority = 10

[[backends]]
id = "secondary"
provider = "openai"
capabilities = ["market_analysis", "summarization"]
expected_latency_ms = 200
reliability = 0.95
priority = 5

[[backends]]
id = "local"
provider = "local"
capabilities = ["market_analysis"]
expected_latency_ms = 500
reliability = 0.9
priority = 1

[[capabilities]]
id = "market_analysis"
name = "Market Analysis"
auto_rank = true

[[capabilities]]
id = "summarization"
name = "Summarization"
active = "secondary"
fallbacks = ["primary"]

[[policy.models]]
id = "default"
roles = ["admin", "analyst", "viewer"]
resources = ["market_analysis", "summarization", "trading_execution", "mcp_settings"]

[[policy.models.grants]]
role = "admin"
resource = "*"
actions = ["read", "write", "execute"]

[[policy.models.grants]]
role = "analyst"
resource = "market_analysis"
actions = ["read", "execute"]

[[policy.models.grants]]
role = "analyst"
resource = "summarization"
actions = ["execute"]

[[policy.models.grants]]
role = "viewer"
resource = "trading_execution"
actions = ["read"]
"#;

pub fn fleet_config() -> SwitchyardConfig {
    toml::from_str(FLEET_CONFIG).expect("fleet config parses")
}

pub fn admin() -> Actor {
    Actor::new("ops-1", "admin")
}

pub fn analyst() -> Actor {
    Actor::new("quant-7", "analyst")
}

pub fn viewer() -> Actor {
    Actor::new("guest", "viewer")
}

/// Engine plus handles to its test doubles.
pub struct Harness {
    pub engine: Engine,
    pub transport: Arc<ScriptedTransport>,
    pub telemetry: Arc<MemoryTelemetry>,
    pub audit: Arc<MemoryAuditLog>,
}

pub fn harness_with(config: &SwitchyardConfig, transport: ScriptedTransport) -> Harness {
    let transport = Arc::new(transport);
    let telemetry = Arc::new(MemoryTelemetry::new());
    let audit = Arc::new(MemoryAuditLog::new(1000));
    let engine = Engine::new(
        config,
        transport.clone(),
        telemetry.clone(),
        audit.clone(),
    )
    .expect("engine builds");
    Harness {
        engine,
        transport,
        telemetry,
        audit,
    }
}

pub fn harness(transport: ScriptedTransport) -> Harness {
    harness_with(&fleet_config(), transport)
}

/// Router over a fleet engine with no scripted behavior.
pub fn test_app() -> (axum::Router, Arc<AppState>) {
    let config = fleet_config();
    let engine = Arc::new(harness_with(&config, ScriptedTransport::new()).engine);
    let state = Arc::new(AppState::new(engine, Arc::new(config)));
    (create_router(Arc::clone(&state)), state)
}
