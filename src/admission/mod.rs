//! Admission Control module.
//!
//! Gatekeeper run before every attempt: a fixed-window rate limiter followed
//! by a bounded connection pool. Both are keyed per backend and never hold a
//! lock across backends.

mod error;
mod pool;
mod rate_limit;

pub use error::*;
pub use pool::*;
pub use rate_limit::*;

use serde::Serialize;
use std::collections::BTreeMap;

/// Combined admission view of one backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionSnapshot {
    pub backend_id: String,
    pub rate_limit: Option<RateLimitSnapshot>,
    pub pool: Option<PoolSnapshot>,
}

/// Rate limiter and connection pool, checked in that order.
#[derive(Default)]
pub struct AdmissionControl {
    limiter: RateLimiter,
    pools: ConnectionPools,
}

impl AdmissionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn pools(&self) -> &ConnectionPools {
        &self.pools
    }

    /// Install admission state for a backend. `None` leaves that check unlimited.
    pub fn install(
        &self,
        backend: &str,
        rate_limit: Option<RateLimit>,
        max_connections: Option<u32>,
    ) {
        match rate_limit {
            Some(limit) => self.limiter.install(backend, limit),
            None => self.limiter.remove(backend),
        }
        match max_connections {
            Some(max) => self.pools.install(backend, max),
            None => self.pools.remove(backend),
        }
    }

    pub fn remove(&self, backend: &str) {
        self.limiter.remove(backend);
        self.pools.remove(backend);
    }

    /// Admit one attempt against `backend`.
    ///
    /// A request that passes the limiter but finds the pool exhausted still
    /// counts against the window.
    pub fn admit(&self, backend: &str) -> Result<PoolPermit, AdmissionError> {
        self.limiter.try_acquire(backend)?;
        self.pools.acquire(backend)
    }

    /// Snapshot of every backend with admission state, sorted by id.
    pub fn status(&self) -> Vec<AdmissionSnapshot> {
        let mut merged: BTreeMap<String, AdmissionSnapshot> = BTreeMap::new();
        for limit in self.limiter.snapshots() {
            let id = limit.backend_id.clone();
            merged
                .entry(id.clone())
                .or_insert_with(|| AdmissionSnapshot {
                    backend_id: id,
                    rate_limit: None,
                    pool: None,
                })
                .rate_limit = Some(limit);
        }
        for pool in self.pools.snapshots() {
            let id = pool.backend_id.clone();
            merged
                .entry(id.clone())
                .or_insert_with(|| AdmissionSnapshot {
                    backend_id: id,
                    rate_limit: None,
                    pool: None,
                })
                .pool = Some(pool);
        }
        merged.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_checks_rate_limit_first() {
        let admission = AdmissionControl::new();
        admission.install("b1", Some(RateLimit::new(1, 60)), Some(5));

        let permit = admission.admit("b1").unwrap();
        assert!(matches!(
            admission.admit("b1"),
            Err(AdmissionError::RateLimited { .. })
        ));
        drop(permit);

        let status = admission.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].pool.as_ref().unwrap().active, 0);
        assert_eq!(status[0].rate_limit.as_ref().unwrap().count, 1);
    }

    #[test]
    fn test_admit_pool_exhausted() {
        let admission = AdmissionControl::new();
        admission.install("b1", None, Some(1));

        let _held = admission.admit("b1").unwrap();
        assert!(matches!(
            admission.admit("b1"),
            Err(AdmissionError::PoolExhausted { .. })
        ));
    }

    #[test]
    fn test_status_merges_by_backend() {
        let admission = AdmissionControl::new();
        admission.install("b", Some(RateLimit::default()), None);
        admission.install("a", None, Some(2));
        admission.install("c", Some(RateLimit::default()), Some(1));

        let status = admission.status();
        let ids: Vec<&str> = status.iter().map(|s| s.backend_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(status[0].rate_limit.is_none());
        assert!(status[1].pool.is_none());
        assert!(status[2].rate_limit.is_some() && status[2].pool.is_some());
    }

    #[test]
    fn test_remove_makes_backend_unlimited() {
        let admission = AdmissionControl::new();
        admission.install("b1", Some(RateLimit::new(0, 60)), Some(0));
        assert!(admission.admit("b1").is_err());

        admission.remove("b1");
        assert!(admission.admit("b1").is_ok());
        assert!(admission.status().is_empty());
    }
}
