//! Execution transport seam.
//!
//! The engine never talks to a backend directly: every attempt goes through
//! an injected [`ExecutionTransport`].

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("backend '{backend}' failed: {message}")]
    Failed { backend: String, message: String },

    #[error("backend '{backend}' timed out")]
    Timeout { backend: String },

    #[error("backend '{backend}' is unreachable")]
    Unreachable { backend: String },
}

/// Carries one unit of work to a backend.
///
/// `timeout` is advisory: the dispatcher enforces it independently.
#[async_trait]
pub trait ExecutionTransport: Send + Sync {
    async fn execute(
        &self,
        backend_id: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, TransportError>;
}

/// Transport for deployments with no data plane wired in. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

#[async_trait]
impl ExecutionTransport for NullTransport {
    async fn execute(
        &self,
        backend_id: &str,
        _payload: &Value,
        _timeout: Duration,
    ) -> Result<Value, TransportError> {
        Err(TransportError::Unreachable {
            backend: backend_id.to_string(),
        })
    }
}

/// Scripted reply for one backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedBehavior {
    /// Reply with `{"backend": id, "payload": payload}`
    Echo,
    Respond(Value),
    Fail(String),
    /// Never reply
    Stall,
    Delay(Duration, Box<ScriptedBehavior>),
}

/// Deterministic transport driven by per-backend scripts.
///
/// Unscripted backends echo.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: DashMap<String, ScriptedBehavior>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, backend: &str, behavior: ScriptedBehavior) -> Self {
        self.script(backend, behavior);
        self
    }

    pub fn script(&self, backend: &str, behavior: ScriptedBehavior) {
        self.scripts.insert(backend.to_string(), behavior);
    }

    /// Number of executions against `backend`.
    pub fn calls(&self, backend: &str) -> usize {
        self.calls.lock().iter().filter(|id| *id == backend).count()
    }

    /// Backends in the order they were executed.
    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn run(
        backend_id: &str,
        payload: &Value,
        behavior: ScriptedBehavior,
    ) -> Result<Value, TransportError> {
        let mut behavior = behavior;
        loop {
            match behavior {
                ScriptedBehavior::Echo => {
                    return Ok(json!({ "backend": backend_id, "payload": payload }))
                }
                ScriptedBehavior::Respond(value) => return Ok(value),
                ScriptedBehavior::Fail(message) => {
                    return Err(TransportError::Failed {
                        backend: backend_id.to_string(),
                        message,
                    })
                }
                ScriptedBehavior::Stall => return std::future::pending().await,
                ScriptedBehavior::Delay(delay, next) => {
                    tokio::time::sleep(delay).await;
                    behavior = *next;
                }
            }
        }
    }
}

#[async_trait]
impl ExecutionTransport for ScriptedTransport {
    async fn execute(
        &self,
        backend_id: &str,
        payload: &Value,
        _timeout: Duration,
    ) -> Result<Value, TransportError> {
        self.calls.lock().push(backend_id.to_string());
        let behavior = self
            .scripts
            .get(backend_id)
            .map(|b| b.value().clone())
            .unwrap_or(ScriptedBehavior::Echo);
        Self::run(backend_id, payload, behavior).await
    }
}
