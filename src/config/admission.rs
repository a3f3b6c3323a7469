//! Admission control defaults

use crate::admission::RateLimit;
use serde::{Deserialize, Serialize};

/// Defaults applied to backends that set no admission limits of their own.
///
/// Leaving a field unset means that check is unlimited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    pub default_rate_limit: Option<RateLimit>,
    pub default_max_connections: Option<u32>,
}
