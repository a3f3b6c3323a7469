//! Mapping of engine errors onto HTTP responses.

use super::types::{ApiError, ApiErrorBody};
use crate::admission::AdmissionError;
use crate::capability::CapabilityError;
use crate::dispatch::DispatchError;
use crate::engine::EngineError;
use crate::policy::PolicyError;
use crate::registry::RegistryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

const INVALID_REQUEST: &str = "invalid_request_error";
const PERMISSION: &str = "permission_error";
const NOT_FOUND: &str = "not_found_error";
const CONFLICT: &str = "conflict_error";

impl ApiError {
    fn new(r#type: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.into(),
                r#type: r#type.to_string(),
                code: code.to_string(),
            },
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, INVALID_REQUEST, message)
    }

    /// Create a forbidden error (403).
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(PERMISSION, "permission_denied", message)
    }

    /// Create a not found error (404).
    pub fn not_found(code: &str, message: impl Into<String>) -> Self {
        Self::new(NOT_FOUND, code, message)
    }

    /// Create a conflict error (409).
    pub fn conflict(code: &str, message: impl Into<String>) -> Self {
        Self::new(CONFLICT, code, message)
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.error.r#type.as_str() {
            INVALID_REQUEST => StatusCode::BAD_REQUEST,
            PERMISSION => StatusCode::FORBIDDEN,
            NOT_FOUND => StatusCode::NOT_FOUND,
            CONFLICT => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let message = err.to_string();
        match err {
            RegistryError::DuplicateBackend(_) => Self::conflict("duplicate_backend", message),
            RegistryError::UnknownBackend(_) => Self::not_found("unknown_backend", message),
            RegistryError::BackendInUse { .. } => Self::conflict("backend_in_use", message),
            RegistryError::CapabilityNotDeclared { .. } => {
                Self::new(INVALID_REQUEST, "capability_not_declared", message)
            }
            RegistryError::InvalidDescriptor { .. } => {
                Self::new(INVALID_REQUEST, "invalid_descriptor", message)
            }
        }
    }
}

impl From<CapabilityError> for ApiError {
    fn from(err: CapabilityError) -> Self {
        let message = err.to_string();
        match err {
            CapabilityError::CapabilityNotFound(_) => {
                Self::not_found("capability_not_found", message)
            }
            CapabilityError::DuplicateCapability(_) => {
                Self::conflict("duplicate_capability", message)
            }
            CapabilityError::UnknownBackend(_) => Self::not_found("unknown_backend", message),
            CapabilityError::BackendDoesNotSupportCapability { .. } => {
                Self::new(INVALID_REQUEST, "backend_does_not_support_capability", message)
            }
            CapabilityError::ActiveBackendInFallbackChain { .. } => {
                Self::new(INVALID_REQUEST, "active_backend_in_fallback_chain", message)
            }
            CapabilityError::DuplicateInChain { .. } => {
                Self::new(INVALID_REQUEST, "duplicate_in_chain", message)
            }
            CapabilityError::CapabilityInUse { .. } => {
                Self::conflict("capability_in_use", message)
            }
            CapabilityError::Registry(inner) => inner.into(),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        let message = err.to_string();
        match err {
            AdmissionError::UnknownBackend(_) => Self::not_found("no_admission_state", message),
            AdmissionError::RateLimited { .. } => Self::conflict("rate_limited", message),
            AdmissionError::PoolExhausted { .. } => Self::conflict("pool_exhausted", message),
            AdmissionError::InvalidRateLimit(_) => {
                Self::new(INVALID_REQUEST, "invalid_rate_limit", message)
            }
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        let message = err.to_string();
        match err {
            PolicyError::PermissionDenied { .. } => Self::forbidden(message),
            PolicyError::UnknownPermissionModel(_) => {
                Self::not_found("permission_model_not_found", message)
            }
            PolicyError::InvalidGrant { .. } => Self::new(INVALID_REQUEST, "invalid_grant", message),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        let message = err.to_string();
        match err {
            DispatchError::PermissionDenied { .. } => Self::forbidden(message),
            DispatchError::CapabilityNotFound(_) => {
                Self::not_found("capability_not_found", message)
            }
            other => Self::conflict(other.error_type(), message),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Config(e) => Self::bad_request(e.to_string()),
            EngineError::Registry(e) => e.into(),
            EngineError::Capability(e) => e.into(),
            EngineError::Admission(e) => e.into(),
            EngineError::Policy(e) => e.into(),
            EngineError::Dispatch(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::not_found("unknown_backend", "x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::conflict("backend_in_use", "x").status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_backend_in_use_maps_to_conflict() {
        let err: ApiError = RegistryError::BackendInUse {
            backend: "gpt-4o".to_string(),
            capabilities: vec!["summarization".to_string()],
        }
        .into();

        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error.code, "backend_in_use");
        assert!(err.error.message.contains("summarization"));
    }

    #[test]
    fn test_nested_registry_error_keeps_its_mapping() {
        let err: ApiError =
            CapabilityError::Registry(RegistryError::UnknownBackend("ghost".to_string())).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error.code, "unknown_backend");
    }

    #[test]
    fn test_chain_violation_is_bad_request() {
        let err: ApiError = CapabilityError::ActiveBackendInFallbackChain {
            capability: "summarization".to_string(),
            backend: "gpt-4o".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error.r#type, "invalid_request_error");
    }

    #[test]
    fn test_serialized_envelope() {
        let err = ApiError::forbidden("role 'viewer' may not write 'mcp_settings'");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["error"]["type"], "permission_error");
        assert_eq!(json["error"]["code"], "permission_denied");
        assert!(json["error"]["message"].as_str().unwrap().contains("viewer"));
    }
}
