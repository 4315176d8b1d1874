// Single-record executor
//
// Order of checks: permission gate, request validation, soft-delete marker,
// transition table, then one conditional write. Only the first two are errors;
// everything after them is a boolean outcome.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

use super::hooks::{AuditEntry, CacheScope, WorkflowHooks};
use super::permissions;
use super::principal::Principal;
use super::record::{ExtraData, RecordType, ReviewableRecord};
use super::status::ReviewAction;
use super::transitions::{self, NextState, Outcome};
use crate::error::WorkflowError;
use crate::store::{RecordStore, RecordUpdate, StatusGuard};
use crate::telemetry::{create_review_span, generate_correlation_id};

/// Extract the rejection note a `REJECT` requires; other actions ignore it.
pub(crate) fn validated_note(
    action: ReviewAction,
    extra: &ExtraData,
) -> Result<Option<String>, WorkflowError> {
    match action {
        ReviewAction::Reject => extra
            .rejection_note()
            .map(|note| Some(note.to_string()))
            .ok_or(WorkflowError::MissingRejectionNote),
        ReviewAction::Submit | ReviewAction::Approve | ReviewAction::Delete => Ok(None),
    }
}

/// Guard for the conditional write: deletions ignore status, everything else
/// requires the status the decision was made on.
pub(crate) fn guard_for(next: NextState, expected: StatusGuard) -> StatusGuard {
    match next {
        NextState::SoftDeleted => StatusGuard::Any,
        NextState::Status(_) => expected,
    }
}

#[derive(Clone)]
pub struct SingleExecutor {
    store: Arc<dyn RecordStore>,
    hooks: WorkflowHooks,
}

impl SingleExecutor {
    pub fn new(store: Arc<dyn RecordStore>, hooks: WorkflowHooks) -> Self {
        Self { store, hooks }
    }

    /// Apply `action` to an already-loaded record.
    ///
    /// Returns `Ok(true)` when the record transitioned, `Ok(false)` when the
    /// table has no rule for the record's status and the actor's roles, the
    /// record is soft-deleted, or another actor moved it first.
    pub async fn execute(
        &self,
        record_type: &RecordType,
        record: &ReviewableRecord,
        action: ReviewAction,
        actor: &Principal,
        extra: &ExtraData,
    ) -> Result<bool, WorkflowError> {
        let span = create_review_span(
            "execute_single",
            record_type.key,
            actor.id(),
            &generate_correlation_id(),
        );

        async move {
            permissions::authorize(record_type, action, actor)?;
            let note = validated_note(action, extra)?;

            if record.is_deleted() {
                debug!(record_id = record.id, action = %action, "Record is soft-deleted");
                return Ok(false);
            }

            let (next, effects) = match transitions::resolve(record.status, action, actor) {
                Outcome::Transition { next, effects } => (next, effects),
                Outcome::Illegal(denial) => {
                    debug!(
                        record_id = record.id,
                        status = %record.status,
                        action = %action,
                        denial = ?denial,
                        "No transition for current state"
                    );
                    return Ok(false);
                }
            };

            let now = Utc::now();
            let update = RecordUpdate::from_effects(next, effects, actor.id(), now, note.as_deref());
            let guard = guard_for(next, StatusGuard::OneOf(vec![record.status]));

            let changed = self
                .store
                .update_one_where(record_type, record.id, &guard, &update)
                .await?;

            if !changed {
                info!(
                    record_id = record.id,
                    expected = %record.status,
                    action = %action,
                    "Record changed concurrently; conditional update matched nothing"
                );
                return Ok(false);
            }

            info!(
                record_id = record.id,
                action = %action,
                from = %record.status,
                to = %next,
                role = ?transitions::effective_role(record.status, action, actor),
                "Report transitioned"
            );

            let entry = AuditEntry {
                actor: actor.id().to_string(),
                action,
                record_type: record_type.key.to_string(),
                record_ids: vec![record.id],
                changed: 1,
                from: Some(record.status),
                to: Some(next),
                at: now,
            };
            self.hooks
                .after_transition(record_type, CacheScope::Year(record.year), actor, entry)
                .await;

            Ok::<bool, WorkflowError>(true)
        }
        .instrument(span)
        .await
    }
}
