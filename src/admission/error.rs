use super::PoolStatus;

/// Admission errors. `RateLimited` and `PoolExhausted` are transient: the
/// dispatcher records them in the attempt trace and moves on to the next
/// candidate. The rest come from admin commands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdmissionError {
    #[error("rate limit exceeded for backend '{backend}', retry after {retry_after_ms}ms")]
    RateLimited { backend: String, retry_after_ms: u64 },

    #[error("connection pool for backend '{backend}' is exhausted ({status})")]
    PoolExhausted { backend: String, status: PoolStatus },

    #[error("no admission state for backend: {0}")]
    UnknownBackend(String),

    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
}
