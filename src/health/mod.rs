//! Health feedback module.
//!
//! Turns dispatch outcomes into backend status transitions. Status is
//! informational only: ranking and dispatch order never read it.

mod config;
mod state;


pub use config::*;
pub use state::*;

use crate::registry::{BackendStatus, Registry};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Consumes attempt outcomes and updates `Registry` status.
pub struct HealthMonitor {
    /// Reference to the backend registry
    registry: Arc<Registry>,
    config: HealthConfig,
    /// Per-backend health tracking state
    state: DashMap<String, Arc<Mutex<BackendHealthState>>>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<Registry>, config: HealthConfig) -> Self {
        Self {
            registry,
            config,
            state: DashMap::new(),
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    fn entry(&self, backend: &str) -> Option<Arc<Mutex<BackendHealthState>>> {
        if let Some(existing) = self.state.get(backend) {
            return Some(Arc::clone(existing.value()));
        }
        let status = self.registry.get(backend)?.status;
        Some(Arc::clone(
            self.state
                .entry(backend.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(BackendHealthState::new(status))))
                .value(),
        ))
    }

    /// Record one executed attempt. Returns the new status on a transition.
    pub fn record(&self, backend: &str, success: bool) -> Option<BackendStatus> {
        if !self.config.enabled {
            return None;
        }
        let entry = self.entry(backend)?;
        let mut state = entry.lock();
        let next = state.apply_outcome(success, &self.config)?;

        match self.registry.set_status(backend, next) {
            Ok(previous) => {
                match next {
                    BackendStatus::Available => tracing::info!(
                        backend_id = %backend,
                        from = %previous,
                        consecutive_successes = state.consecutive_successes,
                        "Backend recovered"
                    ),
                    _ => tracing::warn!(
                        backend_id = %backend,
                        from = %previous,
                        to = %next,
                        consecutive_failures = state.consecutive_failures,
                        "Backend status changed"
                    ),
                }
                Some(next)
            }
            Err(_) => {
                drop(state);
                self.state.remove(backend);
                None
            }
        }
    }

    /// Drop tracking for a deregistered backend.
    pub fn forget(&self, backend: &str) {
        self.state.remove(backend);
    }

    pub fn state(&self, backend: &str) -> Option<BackendHealthState> {
        self.state.get(backend).map(|s| s.value().lock().clone())
    }
}
