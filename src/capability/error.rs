use crate::registry::RegistryError;

/// Errors returned by capability table mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapabilityError {
    #[error("capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("capability already defined: {0}")]
    DuplicateCapability(String),

    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("backend '{backend}' does not support capability '{capability}'")]
    BackendDoesNotSupportCapability { capability: String, backend: String },

    #[error("active backend '{backend}' cannot also appear in the fallback chain of '{capability}'")]
    ActiveBackendInFallbackChain { capability: String, backend: String },

    #[error("backend '{backend}' appears more than once in the fallback chain of '{capability}'")]
    DuplicateInChain { capability: String, backend: String },

    #[error("capability '{capability}' still has assigned backends: {}", backends.join(", "))]
    CapabilityInUse {
        capability: String,
        backends: Vec<String>,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl CapabilityError {
    /// Map a registry pin failure onto the capability vocabulary.
    pub(crate) fn from_pin(capability: &str, err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownBackend(backend) => CapabilityError::UnknownBackend(backend),
            RegistryError::CapabilityNotDeclared { backend, .. } => {
                CapabilityError::BackendDoesNotSupportCapability {
                    capability: capability.to_string(),
                    backend,
                }
            }
            other => CapabilityError::Registry(other),
        }
    }
}
