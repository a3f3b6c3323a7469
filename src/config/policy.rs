//! Policy configuration

use crate::policy::PermissionModel;
use serde::{Deserialize, Serialize};

/// Permission models and which one is active.
///
/// When `active` is unset and exactly one model is defined, that model is
/// activated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub active: Option<String>,
    pub models: Vec<PermissionModel>,
}

impl PolicyConfig {
    /// Id of the model to activate at startup.
    pub fn startup_model(&self) -> Option<&str> {
        match (&self.active, self.models.as_slice()) {
            (Some(id), _) => Some(id.as_str()),
            (None, [only]) => Some(only.id.as_str()),
            _ => None,
        }
    }
}
