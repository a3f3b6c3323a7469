//! Policy Engine module.
//!
//! Role/resource/action authorization against the single active permission
//! model. With no active model every check is denied.

mod error;
mod model;

pub use error::*;
pub use model::*;

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Holds the defined permission models and the active one.
#[derive(Default)]
pub struct PolicyEngine {
    models: DashMap<String, Arc<PermissionModel>>,
    active: RwLock<Option<Arc<PermissionModel>>>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or replace a model. Replacing the active model takes effect immediately.
    pub fn define(&self, model: PermissionModel) -> Result<(), PolicyError> {
        model.validate()?;
        let model = Arc::new(model);

        let mut active = self.active.write();
        self.models.insert(model.id.clone(), Arc::clone(&model));
        if active.as_ref().is_some_and(|current| current.id == model.id) {
            *active = Some(model);
        }
        Ok(())
    }

    /// Make `id` the model every authorization is checked against.
    pub fn activate(&self, id: &str) -> Result<(), PolicyError> {
        let mut active = self.active.write();
        let model = self
            .models
            .get(id)
            .map(|m| Arc::clone(m.value()))
            .ok_or_else(|| PolicyError::UnknownPermissionModel(id.to_string()))?;
        *active = Some(model);
        tracing::info!(model = %id, "Permission model activated");
        Ok(())
    }

    pub fn authorize(&self, role: &str, resource: &str, action: Action) -> Decision {
        let allowed = self
            .active
            .read()
            .as_ref()
            .is_some_and(|model| model.permits(role, resource, action));
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    /// [`authorize`](Self::authorize) as a `Result`, for `?` at call sites.
    pub fn require(
        &self,
        actor: &Actor,
        resource: &str,
        action: Action,
    ) -> Result<(), PolicyError> {
        match self.authorize(&actor.role, resource, action) {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(PolicyError::PermissionDenied {
                role: actor.role.clone(),
                resource: resource.to_string(),
                action,
            }),
        }
    }

    pub fn active_model(&self) -> Option<PermissionModel> {
        self.active.read().as_deref().cloned()
    }

    /// All defined models sorted by id.
    pub fn models(&self) -> Vec<PermissionModel> {
        let mut models: Vec<PermissionModel> = self
            .models
            .iter()
            .map(|m| m.value().as_ref().clone())
            .collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        models
    }
}
