// Review engine facade: one generic engine for every report type

use std::sync::Arc;

use super::bulk::BulkExecutor;
use super::executor::SingleExecutor;
use super::hooks::WorkflowHooks;
use super::permissions;
use super::principal::{Principal, Role};
use super::record::{ExtraData, RecordId, RecordType, ReviewableRecord};
use super::status::{ReportStatus, ReviewAction};
use super::transitions::{self, NextState};
use crate::error::WorkflowError;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct ReviewEngine {
    store: Arc<dyn RecordStore>,
    single: SingleExecutor,
    bulk: BulkExecutor,
}

impl ReviewEngine {
    pub fn new(store: Arc<dyn RecordStore>, hooks: WorkflowHooks) -> Self {
        Self {
            single: SingleExecutor::new(store.clone(), hooks.clone()),
            bulk: BulkExecutor::new(store.clone(), hooks),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn execute_single(
        &self,
        record_type: &RecordType,
        record: &ReviewableRecord,
        action: ReviewAction,
        actor: &Principal,
        extra: &ExtraData,
    ) -> Result<bool, WorkflowError> {
        self.single
            .execute(record_type, record, action, actor, extra)
            .await
    }

    pub async fn execute_bulk(
        &self,
        record_type: &RecordType,
        action: ReviewAction,
        ids: &[RecordId],
        actor: &Principal,
        extra: &ExtraData,
    ) -> Result<u64, WorkflowError> {
        self.bulk
            .execute(record_type, action, ids, actor, extra)
            .await
    }

    pub fn is_legal_transition(
        status: ReportStatus,
        action: ReviewAction,
        role: Role,
    ) -> Option<NextState> {
        transitions::is_legal_transition(status, action, role)
    }

    /// Actions worth offering the actor for this record. Passing this check
    /// does not guarantee success: the record may still move concurrently.
    pub fn available_actions(
        record_type: &RecordType,
        record: &ReviewableRecord,
        actor: &Principal,
    ) -> Vec<ReviewAction> {
        if record.is_deleted() {
            return Vec::new();
        }

        ReviewAction::ALL
            .into_iter()
            .filter(|action| permissions::is_authorized(record_type, *action, actor))
            .filter(|action| {
                transitions::resolve(record.status, *action, actor)
                    .next_state()
                    .is_some()
            })
            .collect()
    }
}
