/// Errors that can occur during registry operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("backend already exists: {0}")]
    DuplicateBackend(String),

    #[error("backend not found: {0}")]
    UnknownBackend(String),

    #[error("backend '{backend}' is referenced by capabilities: {}", capabilities.join(", "))]
    BackendInUse {
        backend: String,
        capabilities: Vec<String>,
    },

    #[error("backend '{backend}' does not declare capability '{capability}'")]
    CapabilityNotDeclared { backend: String, capability: String },

    #[error("invalid backend descriptor '{backend}': {reason}")]
    InvalidDescriptor { backend: String, reason: String },
}
