//! Request and response bodies for the admin API.

use crate::policy::PermissionModel;
use serde::{Deserialize, Serialize};

/// API error response envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    pub code: String,
}

/// List envelope used by every collection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub object: String,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}

/// Body of `PUT /v1/capabilities/:id/active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveRequest {
    pub backend: String,
}

/// Body of `PUT /v1/capabilities/:id/fallbacks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFallbacksRequest {
    pub fallbacks: Vec<String>,
}

/// Body of `PUT /v1/admission/:backend/limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLimitRequest {
    pub max_requests: u32,
    /// Keeps the current window when omitted
    #[serde(default)]
    pub window_seconds: Option<u64>,
}

/// Body of `PUT /v1/policy/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefineModelRequest {
    pub model: PermissionModel,
}

/// Query of `GET /v1/audit`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    pub limit: usize,
}

fn default_audit_limit() -> usize {
    100
}

/// Acknowledgement for commands with no entity to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub status: String,
    pub target: String,
}

impl CommandResponse {
    pub fn ok(target: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            target: target.into(),
        }
    }
}
