use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use super::PolicyError;

/// Resource name matching every resource.
pub const WILDCARD_RESOURCE: &str = "*";

/// Resource guarding administrative mutations.
pub const SETTINGS_RESOURCE: &str = "mcp_settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Execute,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "execute" => Ok(Action::Execute),
            _ => Err(format!("Invalid action: {}. Use: read, write, execute", s)),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::Write => write!(f, "write"),
            Action::Execute => write!(f, "execute"),
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Allow => write!(f, "allow"),
            Decision::Deny => write!(f, "deny"),
        }
    }
}

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }
}

/// `role` may perform `actions` on `resource` (or every resource for `*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub role: String,
    pub resource: String,
    pub actions: BTreeSet<Action>,
}

impl Grant {
    pub fn new(
        role: impl Into<String>,
        resource: impl Into<String>,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        Self {
            role: role.into(),
            resource: resource.into(),
            actions: actions.into_iter().collect(),
        }
    }

    fn matches(&self, role: &str, resource: &str, action: Action) -> bool {
        self.role == role
            && (self.resource == WILDCARD_RESOURCE || self.resource == resource)
            && self.actions.contains(&action)
    }
}

/// Deny-by-default role/resource/action model.
///
/// # Examples
///
/// ```
/// use switchyard::policy::{Action, Grant, PermissionModel};
///
/// let model = PermissionModel::new("default")
///     .with_roles(["admin", "viewer"])
///     .with_resources(["trading_execution"])
///     .with_grant(Grant::new("admin", "*", [Action::Read, Action::Write, Action::Execute]))
///     .with_grant(Grant::new("viewer", "trading_execution", [Action::Read]));
///
/// assert!(model.validate().is_ok());
/// assert!(model.permits("admin", "anything", Action::Execute));
/// assert!(!model.permits("viewer", "trading_execution", Action::Execute));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionModel {
    pub id: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub resources: BTreeSet<String>,
    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl PermissionModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::new(),
            resources: BTreeSet::new(),
            grants: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Every grant must name a declared role and a declared resource (or `*`).
    pub fn validate(&self) -> Result<(), PolicyError> {
        let invalid = |reason: String| PolicyError::InvalidGrant {
            model: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("model id cannot be empty".to_string()));
        }
        for grant in &self.grants {
            if !self.roles.contains(&grant.role) {
                return Err(invalid(format!("undeclared role '{}'", grant.role)));
            }
            if grant.resource != WILDCARD_RESOURCE && !self.resources.contains(&grant.resource) {
                return Err(invalid(format!("undeclared resource '{}'", grant.resource)));
            }
            if grant.actions.is_empty() {
                return Err(invalid(format!(
                    "grant for role '{}' on '{}' has no actions",
                    grant.role, grant.resource
                )));
            }
        }
        Ok(())
    }

    /// Whether any grant allows `action` on `resource` for `role`.
    pub fn permits(&self, role: &str, resource: &str, action: Action) -> bool {
        self.grants
            .iter()
            .any(|grant| grant.matches(role, resource, action))
    }
}
