//! Read-only snapshot handlers. No authorization is required.

use super::{ApiError, AppState, AuditQuery, ListResponse};
use crate::admission::AdmissionSnapshot;
use crate::capability::CapabilityEntry;
use crate::registry::BackendDescriptor;
use crate::telemetry::AuditRecord;
use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;

/// GET /v1/backends
pub async fn backends(State(state): State<Arc<AppState>>) -> Json<ListResponse<BackendDescriptor>> {
    Json(ListResponse::new(state.engine.backends()))
}

/// GET /v1/capabilities
pub async fn capabilities(
    State(state): State<Arc<AppState>>,
) -> Json<ListResponse<CapabilityEntry>> {
    Json(ListResponse::new(state.engine.capabilities()))
}

/// GET /v1/capabilities/:id
pub async fn capability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CapabilityEntry>, ApiError> {
    state.engine.capability(&id).map(Json).ok_or_else(|| {
        ApiError::not_found("capability_not_found", format!("capability not found: {}", id))
    })
}

/// GET /v1/admission
pub async fn admission(
    State(state): State<Arc<AppState>>,
) -> Json<ListResponse<AdmissionSnapshot>> {
    Json(ListResponse::new(state.engine.admission_status()))
}

/// GET /v1/audit?limit=N
pub async fn audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Json<ListResponse<AuditRecord>> {
    Json(ListResponse::new(state.engine.recent_audit(query.limit)))
}
