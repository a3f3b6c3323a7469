//! # Admin API
//!
//! HTTP surface for the presentation layer: read-only snapshots of engine
//! state plus the administrative commands, all served from one [`Engine`].
//!
//! ## Endpoints
//!
//! - `GET /health` - Fleet status with backend counts
//! - `GET /metrics` - Prometheus exposition
//! - `GET /v1/backends` - Registered backends in rank order
//! - `GET /v1/capabilities` / `GET /v1/capabilities/:id` - Capability entries with chains
//! - `PUT /v1/capabilities/:id/active` - Select the active backend
//! - `PUT /v1/capabilities/:id/fallbacks` - Replace the fallback chain
//! - `POST /v1/capabilities/:id/rank` - Auto-rank from the registry
//! - `GET /v1/admission` - Rate limiter and pool status per backend
//! - `PUT /v1/admission/:backend/limit` - Change the limit (and optionally the window)
//! - `POST /v1/admission/:backend/{reset,drain,activate}` - Limiter and pool control
//! - `PUT /v1/policy/models` - Define or replace a permission model
//! - `POST /v1/policy/models/:id/activate` - Switch the active model
//! - `GET /v1/audit` - Recent audit records, newest first
//!
//! Administrative requests identify the caller with `x-actor-id` and
//! `x-actor-role` headers.
//!
//! ## Error Handling
//!
//! ```json
//! {
//!   "error": {
//!     "message": "backend 'gpt-4o' is referenced by capabilities: summarization",
//!     "type": "conflict_error",
//!     "code": "backend_in_use"
//!   }
//! }
//! ```

mod actor;
mod admin;
mod error;
mod health;
mod snapshots;
pub mod types;

pub use actor::ActorHeader;
pub use types::*;

use crate::config::SwitchyardConfig;
use crate::engine::Engine;
use crate::metrics::MetricsCollector;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: Arc<SwitchyardConfig>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    /// Metrics collector for observability
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, config: Arc<SwitchyardConfig>) -> Self {
        // Reuse a detached recorder when one is already installed (tests, repeated serve)
        let prometheus_handle = crate::metrics::setup_metrics().unwrap_or_else(|e| {
            tracing::debug!("Metrics already initialized, creating new handle: {}", e);
            crate::metrics::PrometheusBuilder::new()
                .build_recorder()
                .handle()
        });

        let metrics_collector = Arc::new(MetricsCollector::new(
            Arc::clone(engine.registry()),
            Arc::clone(engine.capability_table()),
            Arc::clone(engine.admission()),
            prometheus_handle,
        ));

        Self {
            engine,
            config,
            start_time: Instant::now(),
            metrics_collector,
        }
    }
}

/// Create the admin router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body = state.config.server.max_body_bytes;
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Router::new()
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .route("/v1/backends", get(snapshots::backends))
        .route("/v1/capabilities", get(snapshots::capabilities))
        .route("/v1/capabilities/:id", get(snapshots::capability))
        .route("/v1/capabilities/:id/active", put(admin::set_active))
        .route("/v1/capabilities/:id/fallbacks", put(admin::set_fallbacks))
        .route("/v1/capabilities/:id/rank", post(admin::auto_rank))
        .route("/v1/admission", get(snapshots::admission))
        .route("/v1/admission/:backend/limit", put(admin::set_limit))
        .route("/v1/admission/:backend/reset", post(admin::reset_limit))
        .route("/v1/admission/:backend/drain", post(admin::drain_pool))
        .route("/v1/admission/:backend/activate", post(admin::activate_pool))
        .route("/v1/policy/models", put(admin::define_model))
        .route("/v1/policy/models/:id/activate", post(admin::activate_model))
        .route("/v1/audit", get(snapshots::audit))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
