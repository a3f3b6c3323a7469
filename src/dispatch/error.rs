use super::AttemptTrace;

/// Terminal dispatch failures.
///
/// Per-candidate conditions (rate limiting, pool exhaustion, attempt failure
/// or timeout) never surface here on their own; they are absorbed into the
/// trace carried by `AllFallbacksExhausted`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("role '{role}' may not execute capability '{capability}'")]
    PermissionDenied { role: String, capability: String },

    #[error("capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("capability '{0}' has no assigned backends")]
    NoCandidates(String),

    #[error("all {} candidate(s) for capability '{capability}' failed", trace.len())]
    AllFallbacksExhausted {
        capability: String,
        trace: AttemptTrace,
    },

    #[error("dispatch for capability '{capability}' was cancelled after {} attempt(s)", trace.len())]
    Cancelled {
        capability: String,
        trace: AttemptTrace,
    },
}

impl DispatchError {
    /// Attempts made before the dispatch failed, if any were made.
    pub fn trace(&self) -> Option<&AttemptTrace> {
        match self {
            DispatchError::AllFallbacksExhausted { trace, .. }
            | DispatchError::Cancelled { trace, .. } => Some(trace),
            _ => None,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            DispatchError::PermissionDenied { .. } => "permission_denied",
            DispatchError::CapabilityNotFound(_) => "capability_not_found",
            DispatchError::NoCandidates(_) => "no_candidates",
            DispatchError::AllFallbacksExhausted { .. } => "all_fallbacks_exhausted",
            DispatchError::Cancelled { .. } => "cancelled",
        }
    }
}
