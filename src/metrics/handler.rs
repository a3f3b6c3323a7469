//! `GET /metrics`

use crate::api::AppState;
use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Refresh the backend, capability and admission gauges, then render every
/// switchyard series. Dispatch counters only appear once a dispatch has run.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics_collector.update_fleet_gauges();
    (
        [(header::CONTENT_TYPE, PROMETHEUS_TEXT)],
        state.metrics_collector.render_metrics(),
    )
}
