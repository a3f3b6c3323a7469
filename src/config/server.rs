//! Server configuration

use serde::{Deserialize, Serialize};

/// Admin HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
    /// Largest accepted request body
    pub max_body_bytes: usize,
    /// Audit records kept in memory for `GET /v1/audit`
    pub audit_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7400,
            request_timeout_seconds: 30,
            max_body_bytes: 256 * 1024,
            audit_capacity: 1000,
        }
    }
}
