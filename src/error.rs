// Error taxonomy for the review workflow
//
// A state mismatch is deliberately absent: executors report it as `Ok(false)`
// or a zero count, never as an error.

use thiserror::Error;

use crate::workflow::status::ReviewAction;

/// Generic message shown to end users when an action did not apply.
pub const STATUS_MISMATCH_MESSAGE: &str = "action failed or status mismatch";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("not authorized: {actor} lacks permission {permission} for {action}")]
    Unauthorized {
        actor: String,
        action: ReviewAction,
        permission: String,
    },

    #[error("a rejection note is required to reject a report")]
    MissingRejectionNote,

    #[error("unknown workflow action: {0}")]
    UnknownAction(String),

    #[error("unknown report status: {0}")]
    UnknownStatus(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Failures the caller should render as a 403-equivalent.
    pub fn is_authorization(&self) -> bool {
        matches!(self, WorkflowError::Unauthorized { .. })
    }

    /// Failures caused by caller input rather than record state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorkflowError::MissingRejectionNote
                | WorkflowError::UnknownAction(_)
                | WorkflowError::UnknownStatus(_)
                | WorkflowError::UnknownRole(_)
                | WorkflowError::UnknownRecordType(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "database")]
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row in {table} (id {id}): {reason}")]
    CorruptRow {
        table: String,
        id: i64,
        reason: String,
    },
}

/// Failure reported by a cache or audit hook. Never rolls back a transition.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("cache invalidation failed: {0}")]
    Cache(String),

    #[error("audit append failed: {0}")]
    Audit(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let unauthorized = WorkflowError::Unauthorized {
            actor: "op-1".to_string(),
            action: ReviewAction::Approve,
            permission: "reforestation.approve".to_string(),
        };
        assert!(unauthorized.is_authorization());
        assert!(!unauthorized.is_validation());

        assert!(WorkflowError::MissingRejectionNote.is_validation());
        assert!(WorkflowError::UnknownAction("PUBLISH".to_string()).is_validation());
        assert!(!WorkflowError::MissingRejectionNote.is_authorization());
    }

    #[test]
    fn test_unauthorized_message_names_permission() {
        let err = WorkflowError::Unauthorized {
            actor: "op-1".to_string(),
            action: ReviewAction::Delete,
            permission: "forest_fire.delete".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("forest_fire.delete"));
        assert!(message.contains("DELETE"));
    }
}
