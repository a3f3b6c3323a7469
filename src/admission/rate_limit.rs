//! Fixed-window rate limiter.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::AdmissionError;

/// Maximum requests admitted per fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl RateLimit {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }

    /// A zero-length window would roll on every call and never throttle.
    ///
    /// `max_requests = 0` is allowed and rejects every request.
    pub fn validate(&self) -> Result<(), AdmissionError> {
        if self.window_seconds == 0 {
            return Err(AdmissionError::InvalidRateLimit(
                "window_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_seconds: 60,
        }
    }
}

#[derive(Debug)]
struct WindowState {
    limit: RateLimit,
    count: u32,
    window_start: Option<Instant>,
}

impl WindowState {
    fn roll(&mut self, now: Instant) {
        if let Some(start) = self.window_start {
            if now.saturating_duration_since(start) >= self.limit.window() {
                self.count = 0;
                self.window_start = None;
            }
        }
    }

    fn throttled(&self) -> bool {
        self.count >= self.limit.max_requests
    }

    /// Time left in the open window, zero when none is open.
    fn remaining(&self, now: Instant) -> Duration {
        self.window_start
            .map(|start| {
                self.limit
                    .window()
                    .saturating_sub(now.saturating_duration_since(start))
            })
            .unwrap_or_default()
    }
}

/// Point-in-time view of one backend's limiter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitSnapshot {
    pub backend_id: String,
    pub max_requests: u32,
    pub window_seconds: u64,
    pub count: u32,
    pub throttled: bool,
    /// Milliseconds until the current window ends (0 if no window is open)
    pub resets_in_ms: u64,
}

/// Per-backend fixed-window limiters.
///
/// Backends without an installed limiter are unlimited.
#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<String, Arc<Mutex<WindowState>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self, backend: &str) -> Option<Arc<Mutex<WindowState>>> {
        self.windows.get(backend).map(|s| Arc::clone(s.value()))
    }

    /// Install (or replace) the limiter for a backend with a fresh window.
    pub fn install(&self, backend: &str, limit: RateLimit) {
        self.windows.insert(
            backend.to_string(),
            Arc::new(Mutex::new(WindowState {
                limit,
                count: 0,
                window_start: None,
            })),
        );
    }

    pub fn remove(&self, backend: &str) {
        self.windows.remove(backend);
    }

    pub fn try_acquire(&self, backend: &str) -> Result<(), AdmissionError> {
        self.try_acquire_at(backend, Instant::now())
    }

    /// Admit one request at `now`. A rejection leaves the count untouched.
    pub fn try_acquire_at(&self, backend: &str, now: Instant) -> Result<(), AdmissionError> {
        let Some(state) = self.state(backend) else {
            return Ok(());
        };
        let mut window = state.lock();
        window.roll(now);

        if window.throttled() {
            let retry_after = window.remaining(now);
            return Err(AdmissionError::RateLimited {
                backend: backend.to_string(),
                retry_after_ms: retry_after.as_millis() as u64,
            });
        }

        if window.window_start.is_none() {
            window.window_start = Some(now);
        }
        window.count += 1;
        Ok(())
    }

    /// Replace the limit, keeping the current window open.
    ///
    /// The count is clamped so it never exceeds the new maximum.
    pub fn set_limit(&self, backend: &str, limit: RateLimit) -> Result<(), AdmissionError> {
        limit.validate()?;
        let state = self
            .state(backend)
            .ok_or_else(|| AdmissionError::UnknownBackend(backend.to_string()))?;
        let mut window = state.lock();
        window.limit = limit;
        window.count = window.count.min(limit.max_requests);
        Ok(())
    }

    /// Zero the count and close the current window.
    pub fn reset(&self, backend: &str) -> Result<(), AdmissionError> {
        let state = self
            .state(backend)
            .ok_or_else(|| AdmissionError::UnknownBackend(backend.to_string()))?;
        let mut window = state.lock();
        window.count = 0;
        window.window_start = None;
        Ok(())
    }

    pub fn snapshot(&self, backend: &str) -> Option<RateLimitSnapshot> {
        self.snapshot_at(backend, Instant::now())
    }

    fn snapshot_at(&self, backend: &str, now: Instant) -> Option<RateLimitSnapshot> {
        let state = self.state(backend)?;
        let mut window = state.lock();
        window.roll(now);
        let resets_in = window.remaining(now);
        Some(RateLimitSnapshot {
            backend_id: backend.to_string(),
            max_requests: window.limit.max_requests,
            window_seconds: window.limit.window_seconds,
            count: window.count,
            throttled: window.throttled(),
            resets_in_ms: resets_in.as_millis() as u64,
        })
    }

    /// Snapshots for every limited backend, sorted by id.
    pub fn snapshots(&self) -> Vec<RateLimitSnapshot> {
        let now = Instant::now();
        let ids: Vec<String> = self.windows.iter().map(|e| e.key().clone()).collect();
        let mut snapshots: Vec<RateLimitSnapshot> = ids
            .iter()
            .filter_map(|id| self.snapshot_at(id, now))
            .collect();
        snapshots.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, window: u64) -> RateLimiter {
        let limiter = RateLimiter::new();
        limiter.install("b1", RateLimit::new(max, window));
        limiter
    }

    #[test]
    fn test_unlimited_without_state() {
        let limiter = RateLimiter::new();
        for _ in 0..1000 {
            assert!(limiter.try_acquire("anything").is_ok());
        }
    }

    #[test]
    fn test_fourth_call_in_window_rejected() {
        let limiter = limiter(3, 60);
        let start = Instant::now();

        for i in 0..3 {
            let now = start + Duration::from_millis(i * 200);
            assert!(limiter.try_acquire_at("b1", now).is_ok());
        }

        let result = limiter.try_acquire_at("b1", start + Duration::from_millis(900));
        match result {
            Err(AdmissionError::RateLimited {
                backend,
                retry_after_ms,
            }) => {
                assert_eq!(backend, "b1");
                assert_eq!(retry_after_ms, 59_100);
            }
            other => panic!("Expected RateLimited, got {:?}", other),
        }

        // Rejection does not bump the count
        let snapshot = limiter.snapshot_at("b1", start + Duration::from_secs(1)).unwrap();
        assert_eq!(snapshot.count, 3);
        assert!(snapshot.throttled);
    }

    #[test]
    fn test_window_rolls_after_expiry() {
        let limiter = limiter(3, 60);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.try_acquire_at("b1", start).unwrap();
        }
        assert!(limiter.try_acquire_at("b1", start + Duration::from_secs(59)).is_err());

        let later = start + Duration::from_secs(60);
        assert!(limiter.try_acquire_at("b1", later).is_ok());
        let snapshot = limiter.snapshot_at("b1", later).unwrap();
        assert_eq!(snapshot.count, 1);
        assert!(!snapshot.throttled);
    }

    #[test]
    fn test_reset_clears_window() {
        let limiter = limiter(1, 60);
        let start = Instant::now();
        limiter.try_acquire_at("b1", start).unwrap();
        assert!(limiter.try_acquire_at("b1", start).is_err());

        limiter.reset("b1").unwrap();
        let snapshot = limiter.snapshot_at("b1", start).unwrap();
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.resets_in_ms, 0);
        assert!(limiter.try_acquire_at("b1", start).is_ok());
    }

    #[test]
    fn test_set_limit_clamps_count() {
        let limiter = limiter(5, 60);
        let start = Instant::now();
        for _ in 0..4 {
            limiter.try_acquire_at("b1", start).unwrap();
        }

        limiter.set_limit("b1", RateLimit::new(2, 60)).unwrap();
        let snapshot = limiter.snapshot_at("b1", start).unwrap();
        assert_eq!(snapshot.count, 2);
        assert!(snapshot.throttled);

        limiter.set_limit("b1", RateLimit::new(10, 60)).unwrap();
        assert!(limiter.try_acquire_at("b1", start).is_ok());
    }

    #[test]
    fn test_unknown_backend_commands() {
        let limiter = RateLimiter::new();
        assert_eq!(
            limiter.set_limit("ghost", RateLimit::new(1, 60)),
            Err(AdmissionError::UnknownBackend("ghost".to_string()))
        );
        assert!(limiter.reset("ghost").is_err());
        assert!(limiter.snapshot("ghost").is_none());
    }

    #[test]
    fn test_zero_limit_rejects_everything() {
        let limiter = limiter(0, 60);
        assert!(limiter.try_acquire("b1").is_err());
    }

    #[test]
    fn test_zero_window_is_invalid() {
        assert!(matches!(
            RateLimit::new(1, 0).validate(),
            Err(AdmissionError::InvalidRateLimit(_))
        ));
        assert!(RateLimit::new(0, 1).validate().is_ok());

        let limiter = limiter(1, 60);
        assert!(matches!(
            limiter.set_limit("b1", RateLimit::new(1, 0)),
            Err(AdmissionError::InvalidRateLimit(_))
        ));
        let snapshot = limiter.snapshot("b1").unwrap();
        assert_eq!(snapshot.window_seconds, 60);
    }

    #[test]
    fn test_set_limit_changes_window() {
        let limiter = limiter(1, 60);
        let start = Instant::now();
        limiter.try_acquire_at("b1", start).unwrap();

        limiter.set_limit("b1", RateLimit::new(1, 10)).unwrap();
        assert!(limiter.try_acquire_at("b1", start + Duration::from_secs(9)).is_err());
        assert!(limiter.try_acquire_at("b1", start + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_backends_are_independent() {
        let limiter = limiter(1, 60);
        limiter.install("b2", RateLimit::new(1, 60));

        assert!(limiter.try_acquire("b1").is_ok());
        assert!(limiter.try_acquire("b1").is_err());
        assert!(limiter.try_acquire("b2").is_ok());
    }
}
