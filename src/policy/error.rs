use super::Action;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("role '{role}' may not {action} '{resource}'")]
    PermissionDenied {
        role: String,
        resource: String,
        action: Action,
    },

    #[error("permission model not found: {0}")]
    UnknownPermissionModel(String),

    #[error("invalid permission model '{model}': {reason}")]
    InvalidGrant { model: String, reason: String },
}
