// Acting principal: identity, organizational roles and coarse permissions

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::WorkflowError;

/// Organizational roles relevant to report review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Super-role: satisfies every actor condition.
    Admin,
    /// First review stage (section head).
    Kasi,
    /// Second review stage (branch office head).
    Kacdk,
    /// Data-entry staff.
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Kasi => "kasi",
            Role::Kacdk => "kacdk",
            Role::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "kasi" => Ok(Role::Kasi),
            "kacdk" => Ok(Role::Kacdk),
            "operator" => Ok(Role::Operator),
            _ => Err(WorkflowError::UnknownRole(s.to_string())),
        }
    }
}

/// The actor on whose behalf a workflow operation runs. Always passed
/// explicitly; the engine never looks up a "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: String,
    roles: BTreeSet<Role>,
    permissions: HashSet<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::new(),
            permissions: HashSet::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Roles in a stable order (admin, kasi, kacdk, operator).
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Literal permission membership; the admin bypass lives in the gate.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("KASI".parse::<Role>().unwrap(), Role::Kasi);
        assert_eq!("kacdk".parse::<Role>().unwrap(), Role::Kacdk);
        assert!(matches!("ranger".parse::<Role>(), Err(WorkflowError::UnknownRole(_))));
    }

    #[test]
    fn test_principal_builder() {
        let actor = Principal::new("u-17")
            .with_role(Role::Kasi)
            .with_permissions(["reforestation.approve", "reforestation.edit"]);

        assert_eq!(actor.id(), "u-17");
        assert!(actor.has_role(Role::Kasi));
        assert!(!actor.is_admin());
        assert!(actor.has_permission("reforestation.approve"));
        assert!(!actor.has_permission("reforestation.delete"));
    }

    #[test]
    fn test_roles_iterate_in_stable_order() {
        let actor = Principal::new("u-1")
            .with_role(Role::Operator)
            .with_role(Role::Kacdk)
            .with_role(Role::Kasi);
        let roles: Vec<Role> = actor.roles().collect();
        assert_eq!(roles, vec![Role::Kasi, Role::Kacdk, Role::Operator]);
    }
}
