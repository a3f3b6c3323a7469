//! Per-backend connection pools with RAII permits.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AdmissionError;

/// Lifecycle of a connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    /// Accepting acquisitions
    #[default]
    Active,
    /// Refusing acquisitions, waiting for in-flight connections to return
    Draining,
    /// Drained and empty
    Closed,
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolStatus::Active => write!(f, "active"),
            PoolStatus::Draining => write!(f, "draining"),
            PoolStatus::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug)]
struct PoolState {
    max: u32,
    active: u32,
    idle: u32,
    status: PoolStatus,
}

impl PoolState {
    fn release(&mut self) {
        self.active = self.active.saturating_sub(1);
        match self.status {
            PoolStatus::Active => self.idle += 1,
            PoolStatus::Draining => {
                if self.active == 0 {
                    self.status = PoolStatus::Closed;
                }
            }
            PoolStatus::Closed => {}
        }
    }
}

/// Point-in-time view of one backend's pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSnapshot {
    pub backend_id: String,
    pub max_connections: u32,
    pub active: u32,
    pub idle: u32,
    pub status: PoolStatus,
}

/// A held connection. Returned to the pool when dropped.
#[derive(Debug)]
pub struct PoolPermit {
    backend: String,
    pool: Option<Arc<Mutex<PoolState>>>,
}

impl PoolPermit {
    pub fn backend_id(&self) -> &str {
        &self.backend
    }

    /// Return the connection now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.lock().release();
        }
    }
}

/// Per-backend connection pools.
///
/// Backends without an installed pool are unbounded.
#[derive(Default)]
pub struct ConnectionPools {
    pools: DashMap<String, Arc<Mutex<PoolState>>>,
}

impl ConnectionPools {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self, backend: &str) -> Option<Arc<Mutex<PoolState>>> {
        self.pools.get(backend).map(|s| Arc::clone(s.value()))
    }

    fn require(&self, backend: &str) -> Result<Arc<Mutex<PoolState>>, AdmissionError> {
        self.state(backend)
            .ok_or_else(|| AdmissionError::UnknownBackend(backend.to_string()))
    }

    /// Install (or replace) an empty active pool.
    pub fn install(&self, backend: &str, max_connections: u32) {
        self.pools.insert(
            backend.to_string(),
            Arc::new(Mutex::new(PoolState {
                max: max_connections,
                active: 0,
                idle: 0,
                status: PoolStatus::Active,
            })),
        );
    }

    pub fn remove(&self, backend: &str) {
        self.pools.remove(backend);
    }

    /// Take a connection, reusing an idle one when available.
    pub fn acquire(&self, backend: &str) -> Result<PoolPermit, AdmissionError> {
        let Some(pool) = self.state(backend) else {
            return Ok(PoolPermit {
                backend: backend.to_string(),
                pool: None,
            });
        };

        {
            let mut state = pool.lock();
            if state.status != PoolStatus::Active || state.active >= state.max {
                return Err(AdmissionError::PoolExhausted {
                    backend: backend.to_string(),
                    status: state.status,
                });
            }
            if state.idle > 0 {
                state.idle -= 1;
            }
            state.active += 1;
        }

        Ok(PoolPermit {
            backend: backend.to_string(),
            pool: Some(pool),
        })
    }

    /// Stop accepting acquisitions. Idempotent.
    pub fn drain(&self, backend: &str) -> Result<PoolStatus, AdmissionError> {
        let pool = self.require(backend)?;
        let mut state = pool.lock();
        if state.status != PoolStatus::Closed {
            state.idle = 0;
            state.status = if state.active == 0 {
                PoolStatus::Closed
            } else {
                PoolStatus::Draining
            };
        }
        tracing::info!(backend_id = %backend, status = %state.status, "Connection pool draining");
        Ok(state.status)
    }

    /// Reopen a draining or closed pool.
    pub fn activate(&self, backend: &str) -> Result<PoolStatus, AdmissionError> {
        let pool = self.require(backend)?;
        let mut state = pool.lock();
        state.status = PoolStatus::Active;
        tracing::info!(backend_id = %backend, "Connection pool activated");
        Ok(state.status)
    }

    pub fn snapshot(&self, backend: &str) -> Option<PoolSnapshot> {
        let pool = self.state(backend)?;
        let state = pool.lock();
        Some(PoolSnapshot {
            backend_id: backend.to_string(),
            max_connections: state.max,
            active: state.active,
            idle: state.idle,
            status: state.status,
        })
    }

    /// Snapshots for every pooled backend, sorted by id.
    pub fn snapshots(&self) -> Vec<PoolSnapshot> {
        let ids: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        let mut snapshots: Vec<PoolSnapshot> =
            ids.iter().filter_map(|id| self.snapshot(id)).collect();
        snapshots.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pools(max: u32) -> ConnectionPools {
        let pools = ConnectionPools::new();
        pools.install("b1", max);
        pools
    }

    fn counts(pools: &ConnectionPools) -> (u32, u32, PoolStatus) {
        let s = pools.snapshot("b1").unwrap();
        (s.active, s.idle, s.status)
    }

    #[test]
    fn test_third_acquire_exhausted() {
        let pools = pools(2);
        let first = pools.acquire("b1").unwrap();
        let _second = pools.acquire("b1").unwrap();

        assert_eq!(
            pools.acquire("b1").unwrap_err(),
            AdmissionError::PoolExhausted {
                backend: "b1".to_string(),
                status: PoolStatus::Active,
            }
        );

        first.release();
        assert_eq!(counts(&pools), (1, 1, PoolStatus::Active));
        let _third = pools.acquire("b1").unwrap();
        assert_eq!(counts(&pools), (2, 0, PoolStatus::Active));
    }

    #[test]
    fn test_permit_released_on_drop() {
        let pools = pools(1);
        {
            let _permit = pools.acquire("b1").unwrap();
            assert!(pools.acquire("b1").is_err());
        }
        assert!(pools.acquire("b1").is_ok());
    }

    #[test]
    fn test_unbounded_without_pool() {
        let pools = ConnectionPools::new();
        let permits: Vec<_> = (0..100).map(|_| pools.acquire("x").unwrap()).collect();
        assert_eq!(permits.len(), 100);
        assert_eq!(permits[0].backend_id(), "x");
    }

    #[test]
    fn test_drain_waits_for_in_flight() {
        let pools = pools(3);
        let in_flight = pools.acquire("b1").unwrap();
        pools.acquire("b1").unwrap().release();
        assert_eq!(counts(&pools), (1, 1, PoolStatus::Active));

        assert_eq!(pools.drain("b1").unwrap(), PoolStatus::Draining);
        assert_eq!(counts(&pools), (1, 0, PoolStatus::Draining));
        assert!(matches!(
            pools.acquire("b1"),
            Err(AdmissionError::PoolExhausted {
                status: PoolStatus::Draining,
                ..
            })
        ));

        drop(in_flight);
        assert_eq!(counts(&pools), (0, 0, PoolStatus::Closed));
    }

    #[test]
    fn test_drain_is_idempotent() {
        let pools = pools(2);
        assert_eq!(pools.drain("b1").unwrap(), PoolStatus::Closed);
        assert_eq!(pools.drain("b1").unwrap(), PoolStatus::Closed);
        assert!(pools.acquire("b1").is_err());
    }

    #[test]
    fn test_activate_reopens() {
        let pools = pools(2);
        pools.drain("b1").unwrap();
        assert_eq!(pools.activate("b1").unwrap(), PoolStatus::Active);
        assert!(pools.acquire("b1").is_ok());
    }

    #[test]
    fn test_active_plus_idle_never_exceeds_max() {
        let pools = pools(3);
        for _ in 0..10 {
            let a = pools.acquire("b1").unwrap();
            let b = pools.acquire("b1").unwrap();
            drop(a);
            let c = pools.acquire("b1").unwrap();
            let s = pools.snapshot("b1").unwrap();
            assert!(s.active + s.idle <= s.max_connections);
            drop(b);
            drop(c);
            let s = pools.snapshot("b1").unwrap();
            assert!(s.active + s.idle <= s.max_connections);
        }
    }

    #[test]
    fn test_unknown_pool_commands() {
        let pools = ConnectionPools::new();
        assert!(matches!(pools.drain("x"), Err(AdmissionError::UnknownBackend(_))));
        assert!(pools.activate("x").is_err());
        assert!(pools.snapshot("x").is_none());
    }
}
