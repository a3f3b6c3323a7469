//! # Metrics Collection Module
//!
//! Prometheus export of dispatch outcomes and fleet state.
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `switchyard_dispatch_total{capability, outcome}` - Dispatches by terminal outcome
//! - `switchyard_attempts_total{capability, backend, outcome}` - Individual attempts
//! - `switchyard_fallbacks_total{capability}` - Dispatches served by a fallback
//! - `switchyard_authorization_total{decision}` - Authorization decisions
//!
//! **Histograms:**
//! - `switchyard_attempt_duration_seconds{backend}` - Attempt latency
//!
//! **Gauges:**
//! - `switchyard_backends_total` - Registered backends
//! - `switchyard_backends_available` - Backends with status `available`
//! - `switchyard_capabilities_total` - Defined capabilities
//! - `switchyard_pool_active{backend}` / `switchyard_pool_idle{backend}` - Pool occupancy
//! - `switchyard_rate_limit_count{backend}` - Requests in the current window

pub mod handler;

// Re-export PrometheusBuilder for test compatibility
pub use metrics_exporter_prometheus::PrometheusBuilder;

use crate::admission::AdmissionControl;
use crate::capability::CapabilityTable;
use crate::registry::{BackendStatus, Registry};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe cache for sanitized Prometheus label values.
#[derive(Debug, Default)]
pub struct LabelCache {
    cache: DashMap<String, String>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get sanitized Prometheus label (cached for performance).
    ///
    /// Replaces anything outside `[a-zA-Z0-9_]` with underscores and prefixes
    /// a leading digit with an underscore.
    pub fn sanitize(&self, label: &str) -> String {
        if let Some(cached) = self.cache.get(label) {
            return cached.clone();
        }

        let mut sanitized = label
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>();

        if sanitized.is_empty() || sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            sanitized.insert(0, '_');
        }

        self.cache.insert(label.to_string(), sanitized.clone());
        sanitized
    }
}

/// Central coordinator for gauge computation and rendering.
pub struct MetricsCollector {
    registry: Arc<Registry>,
    capabilities: Arc<CapabilityTable>,
    admission: Arc<AdmissionControl>,
    /// Startup time for uptime calculation
    start_time: Instant,
    labels: LabelCache,
    /// Prometheus handle for rendering metrics
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(
        registry: Arc<Registry>,
        capabilities: Arc<CapabilityTable>,
        admission: Arc<AdmissionControl>,
        prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        Self {
            registry,
            capabilities,
            admission,
            start_time: Instant::now(),
            labels: LabelCache::new(),
            prometheus_handle,
        }
    }

    pub fn sanitize_label(&self, label: &str) -> String {
        self.labels.sanitize(label)
    }

    /// Update fleet and admission gauges from current state.
    pub fn update_fleet_gauges(&self) {
        let backends = self.registry.list();

        metrics::gauge!("switchyard_backends_total").set(backends.len() as f64);
        let available = backends
            .iter()
            .filter(|b| b.status == BackendStatus::Available)
            .count();
        metrics::gauge!("switchyard_backends_available").set(available as f64);
        metrics::gauge!("switchyard_capabilities_total").set(self.capabilities.len() as f64);

        for snapshot in self.admission.status() {
            let backend = self.sanitize_label(&snapshot.backend_id);
            if let Some(pool) = &snapshot.pool {
                metrics::gauge!("switchyard_pool_active", "backend" => backend.clone())
                    .set(pool.active as f64);
                metrics::gauge!("switchyard_pool_idle", "backend" => backend.clone())
                    .set(pool.idle as f64);
            }
            if let Some(limit) = &snapshot.rate_limit {
                metrics::gauge!("switchyard_rate_limit_count", "backend" => backend)
                    .set(limit.count as f64);
            }
        }
    }

    /// Get uptime in seconds since startup.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Render Prometheus metrics in text format.
    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Initialize Prometheus metrics exporter with custom histogram buckets.
///
/// Buckets: [0.05, 0.1, 0.25, 0.5, 1, 2.5, 5, 10, 30, 60] seconds.
///
/// Returns a PrometheusHandle that can be used to render metrics.
pub fn setup_metrics(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    let duration_buckets = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("switchyard_attempt_duration_seconds".to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}
