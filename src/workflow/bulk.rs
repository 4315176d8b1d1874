// Bulk executor
//
// Applies one action to a list of ids by issuing conditional updates derived
// from the transition table:
//
//   UPDATE <table> SET <next status, effects>
//   WHERE id IN (<ids>) AND status IN (<expected>) AND deleted_at IS NULL
//
// Rows that already moved, were deleted, or do not exist are skipped silently.
// The returned count covers only rows that actually changed.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

use super::executor::{guard_for, validated_note};
use super::hooks::{AuditEntry, CacheScope, WorkflowHooks};
use super::permissions;
use super::principal::Principal;
use super::record::{ExtraData, RecordId, RecordType};
use super::status::ReviewAction;
use super::transitions;
use crate::error::WorkflowError;
use crate::store::{RecordStore, RecordUpdate, StatusGuard};
use crate::telemetry::{create_review_span, generate_correlation_id};

#[derive(Clone)]
pub struct BulkExecutor {
    store: Arc<dyn RecordStore>,
    hooks: WorkflowHooks,
}

impl BulkExecutor {
    pub fn new(store: Arc<dyn RecordStore>, hooks: WorkflowHooks) -> Self {
        Self { store, hooks }
    }

    /// Apply `action` to every id whose current status the actor may act on.
    /// Returns the number of records that transitioned; zero is a valid outcome.
    pub async fn execute(
        &self,
        record_type: &RecordType,
        action: ReviewAction,
        ids: &[RecordId],
        actor: &Principal,
        extra: &ExtraData,
    ) -> Result<u64, WorkflowError> {
        let span = create_review_span(
            "execute_bulk",
            record_type.key,
            actor.id(),
            &generate_correlation_id(),
        );

        async move {
            permissions::authorize(record_type, action, actor)?;
            let note = validated_note(action, extra)?;

            let requested = ids.iter().collect::<BTreeSet<_>>().len();
            if requested == 0 {
                return Ok(0);
            }

            let plan = transitions::bulk_plan(action, actor);
            if plan.is_empty() {
                debug!(
                    action = %action,
                    requested,
                    "Actor holds no role the table accepts for this action"
                );
                return Ok(0);
            }

            let now = Utc::now();
            let mut changed = 0u64;
            for step in &plan {
                let expected = if step.matches_any_status() {
                    StatusGuard::Any
                } else {
                    StatusGuard::OneOf(step.expected.clone())
                };
                let guard = guard_for(step.next, expected);
                let update =
                    RecordUpdate::from_effects(step.next, step.effects, actor.id(), now, note.as_deref());

                let step_changed = self
                    .store
                    .update_where(record_type, ids, &guard, &update)
                    .await?;
                debug!(
                    expected = ?step.expected,
                    to = %step.next,
                    changed = step_changed,
                    "Bulk step applied"
                );
                changed += step_changed;
            }

            info!(
                action = %action,
                requested,
                changed,
                skipped = (requested as u64).saturating_sub(changed),
                "Bulk review action completed"
            );

            if changed > 0 {
                let to = match plan.as_slice() {
                    [only] => Some(only.next),
                    _ => None,
                };
                let entry = AuditEntry {
                    actor: actor.id().to_string(),
                    action,
                    record_type: record_type.key.to_string(),
                    record_ids: ids.to_vec(),
                    changed,
                    from: None,
                    to,
                    at: now,
                };
                self.hooks
                    .after_transition(record_type, CacheScope::AllYears, actor, entry)
                    .await;
            }

            Ok::<u64, WorkflowError>(changed)
        }
        .instrument(span)
        .await
    }
}
