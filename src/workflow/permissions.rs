// Coarse, state-independent permission gate checked before the transition table

use serde::{Deserialize, Serialize};
use std::fmt;

use super::principal::Principal;
use super::record::RecordType;
use super::status::ReviewAction;
use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Edit,
    Approve,
    Delete,
}

impl PermissionKind {
    pub fn for_action(action: ReviewAction) -> Self {
        match action {
            ReviewAction::Submit => PermissionKind::Edit,
            ReviewAction::Approve | ReviewAction::Reject => PermissionKind::Approve,
            ReviewAction::Delete => PermissionKind::Delete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Edit => "edit",
            PermissionKind::Approve => "approve",
            PermissionKind::Delete => "delete",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission string required for `action` on `record_type`, e.g. `forest_fire.approve`.
pub fn required_permission(record_type: &RecordType, action: ReviewAction) -> String {
    format!(
        "{}.{}",
        record_type.permission_module,
        PermissionKind::for_action(action)
    )
}

/// Admins pass unconditionally; everyone else needs the module permission.
pub fn is_authorized(record_type: &RecordType, action: ReviewAction, actor: &Principal) -> bool {
    actor.is_admin() || actor.has_permission(&required_permission(record_type, action))
}

pub fn authorize(
    record_type: &RecordType,
    action: ReviewAction,
    actor: &Principal,
) -> Result<(), WorkflowError> {
    if is_authorized(record_type, action, actor) {
        return Ok(());
    }

    let permission = required_permission(record_type, action);
    tracing::debug!(
        actor = %actor.id(),
        action = %action,
        permission = %permission,
        "Permission gate refused action"
    );
    Err(WorkflowError::Unauthorized {
        actor: actor.id().to_string(),
        action,
        permission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::principal::Role;
    use crate::workflow::record::{FOREST_FIRE, REFORESTATION};

    #[test]
    fn test_action_permission_map() {
        assert_eq!(required_permission(&REFORESTATION, ReviewAction::Submit), "reforestation.edit");
        assert_eq!(required_permission(&REFORESTATION, ReviewAction::Approve), "reforestation.approve");
        assert_eq!(required_permission(&REFORESTATION, ReviewAction::Reject), "reforestation.approve");
        assert_eq!(required_permission(&FOREST_FIRE, ReviewAction::Delete), "forest_fire.delete");
    }

    #[test]
    fn test_permission_is_scoped_to_module() {
        let actor = Principal::new("k-1")
            .with_role(Role::Kasi)
            .with_permission("reforestation.approve");

        assert!(authorize(&REFORESTATION, ReviewAction::Approve, &actor).is_ok());
        let err = authorize(&FOREST_FIRE, ReviewAction::Approve, &actor).unwrap_err();
        assert!(err.is_authorization());
    }

    #[test]
    fn test_review_role_alone_does_not_pass_gate() {
        let actor = Principal::new("k-2").with_role(Role::Kasi);
        assert!(!is_authorized(&REFORESTATION, ReviewAction::Approve, &actor));
    }

    #[test]
    fn test_admin_bypasses_gate() {
        let admin = Principal::new("root").with_role(Role::Admin);
        for action in ReviewAction::ALL {
            assert!(is_authorized(&FOREST_FIRE, action, &admin));
        }
    }
}
