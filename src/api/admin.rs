//! Administrative command handlers.
//!
//! Every handler resolves the caller from [`ActorHeader`] and goes through
//! the engine, which authorizes against `mcp_settings/write` and audits.

use super::{
    ActorHeader, ApiError, AppState, CommandResponse, DefineModelRequest, SetActiveRequest,
    SetFallbacksRequest, SetLimitRequest,
};
use crate::admission::AdmissionSnapshot;
use crate::capability::CapabilityEntry;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn admission_of(state: &AppState, backend: &str) -> Result<AdmissionSnapshot, ApiError> {
    state
        .engine
        .admission_status()
        .into_iter()
        .find(|s| s.backend_id == backend)
        .ok_or_else(|| {
            ApiError::not_found(
                "no_admission_state",
                format!("no admission state for backend: {}", backend),
            )
        })
}

/// PUT /v1/capabilities/:id/active
pub async fn set_active(
    State(state): State<Arc<AppState>>,
    ActorHeader(actor): ActorHeader,
    Path(id): Path<String>,
    payload: Result<Json<SetActiveRequest>, JsonRejection>,
) -> Result<Json<CapabilityEntry>, ApiError> {
    let request = body(payload)?;
    let entry = state.engine.set_active(&actor, &id, &request.backend)?;
    Ok(Json(entry))
}

/// PUT /v1/capabilities/:id/fallbacks
pub async fn set_fallbacks(
    State(state): State<Arc<AppState>>,
    ActorHeader(actor): ActorHeader,
    Path(id): Path<String>,
    payload: Result<Json<SetFallbacksRequest>, JsonRejection>,
) -> Result<Json<CapabilityEntry>, ApiError> {
    let request = body(payload)?;
    let entry = state
        .engine
        .set_fallback_chain(&actor, &id, request.fallbacks)?;
    Ok(Json(entry))
}

/// POST /v1/capabilities/:id/rank
pub async fn auto_rank(
    State(state): State<Arc<AppState>>,
    ActorHeader(actor): ActorHeader,
    Path(id): Path<String>,
) -> Result<Json<CapabilityEntry>, ApiError> {
    Ok(Json(state.engine.auto_rank(&actor, &id)?))
}

/// PUT /v1/admission/:backend/limit
pub async fn set_limit(
    State(state): State<Arc<AppState>>,
    ActorHeader(actor): ActorHeader,
    Path(backend): Path<String>,
    payload: Result<Json<SetLimitRequest>, JsonRejection>,
) -> Result<Json<AdmissionSnapshot>, ApiError> {
    let request = body(payload)?;
    state.engine.set_rate_limit(
        &actor,
        &backend,
        request.max_requests,
        request.window_seconds,
    )?;
    Ok(Json(admission_of(&state, &backend)?))
}

/// POST /v1/admission/:backend/reset
pub async fn reset_limit(
    State(state): State<Arc<AppState>>,
    ActorHeader(actor): ActorHeader,
    Path(backend): Path<String>,
) -> Result<Json<AdmissionSnapshot>, ApiError> {
    state.engine.reset_rate_limit(&actor, &backend)?;
    Ok(Json(admission_of(&state, &backend)?))
}

/// POST /v1/admission/:backend/drain
pub async fn drain_pool(
    State(state): State<Arc<AppState>>,
    ActorHeader(actor): ActorHeader,
    Path(backend): Path<String>,
) -> Result<Json<AdmissionSnapshot>, ApiError> {
    state.engine.drain_pool(&actor, &backend)?;
    Ok(Json(admission_of(&state, &backend)?))
}

/// POST /v1/admission/:backend/activate
pub async fn activate_pool(
    State(state): State<Arc<AppState>>,
    ActorHeader(actor): ActorHeader,
    Path(backend): Path<String>,
) -> Result<Json<AdmissionSnapshot>, ApiError> {
    state.engine.activate_pool(&actor, &backend)?;
    Ok(Json(admission_of(&state, &backend)?))
}

/// PUT /v1/policy/models
pub async fn define_model(
    State(state): State<Arc<AppState>>,
    ActorHeader(actor): ActorHeader,
    payload: Result<Json<DefineModelRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let request = body(payload)?;
    let id = request.model.id.clone();
    state.engine.define_permission_model(&actor, request.model)?;
    Ok(Json(CommandResponse::ok(id)))
}

/// POST /v1/policy/models/:id/activate
pub async fn activate_model(
    State(state): State<Arc<AppState>>,
    ActorHeader(actor): ActorHeader,
    Path(id): Path<String>,
) -> Result<Json<CommandResponse>, ApiError> {
    state.engine.activate_permission_model(&actor, &id)?;
    Ok(Json(CommandResponse::ok(id)))
}
