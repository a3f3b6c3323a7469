//! Health check endpoint handler.

use crate::api::AppState;
use crate::registry::BackendStatus;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub backends: BackendCounts,
    pub capabilities: usize,
}

/// Backend status counts.
#[derive(Debug, Serialize)]
pub struct BackendCounts {
    pub total: usize,
    pub available: usize,
    pub degraded: usize,
    pub unavailable: usize,
}

/// GET /health - Return fleet status.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backends = state.engine.backends();
    let count = |status: BackendStatus| backends.iter().filter(|b| b.status == status).count();
    let counts = BackendCounts {
        total: backends.len(),
        available: count(BackendStatus::Available),
        degraded: count(BackendStatus::Degraded),
        unavailable: count(BackendStatus::Unavailable),
    };

    let status = match (counts.available, counts.total) {
        (a, t) if a == t && t > 0 => "healthy",
        (a, _) if a > 0 || counts.degraded > 0 => "degraded",
        _ => "unhealthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backends: counts,
        capabilities: state.engine.capability_table().len(),
    })
}
