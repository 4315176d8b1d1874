// Record store abstraction
//
// Every status mutation goes through `update_where`, a conditional update that
// only touches rows that are not soft-deleted and whose current status the
// guard accepts. Implementations must apply it atomically per call.

pub mod memory;
#[cfg(feature = "database")]
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::workflow::ordering::OrderTerm;
use crate::workflow::record::{RecordId, RecordType, ReviewableRecord};
use crate::workflow::status::ReportStatus;
use crate::workflow::transitions::{Effect, NextState};

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use sqlite::SqliteStore;

/// Precondition on the current status of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusGuard {
    Any,
    OneOf(Vec<ReportStatus>),
}

impl StatusGuard {
    pub fn accepts(&self, status: ReportStatus) -> bool {
        match self {
            StatusGuard::Any => true,
            StatusGuard::OneOf(expected) => expected.contains(&status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteUpdate {
    Keep,
    Clear,
    Set(String),
}

/// Everything one transition writes, applied in a single statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub next: NextState,
    pub rejection_note: NoteUpdate,
    /// Approval timestamps are only written when still unset.
    pub stamp_kasi_approval: bool,
    pub stamp_cdk_approval: bool,
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl RecordUpdate {
    pub fn from_effects(
        next: NextState,
        effects: &[Effect],
        actor: &str,
        at: DateTime<Utc>,
        rejection_note: Option<&str>,
    ) -> Self {
        let mut update = Self {
            next,
            rejection_note: NoteUpdate::Keep,
            stamp_kasi_approval: false,
            stamp_cdk_approval: false,
            actor: actor.to_string(),
            at,
        };

        for effect in effects {
            match effect {
                Effect::ClearRejectionNote => update.rejection_note = NoteUpdate::Clear,
                Effect::SetRejectionNote => {
                    if let Some(note) = rejection_note {
                        update.rejection_note = NoteUpdate::Set(note.to_string());
                    }
                }
                Effect::StampKasiApproval => update.stamp_kasi_approval = true,
                Effect::StampCdkApproval => update.stamp_cdk_approval = true,
                // Carried by `next`.
                Effect::StampDeletion => {}
            }
        }

        update
    }

    pub fn soft_delete(actor: &str, at: DateTime<Utc>) -> Self {
        Self::from_effects(NextState::SoftDeleted, &[Effect::StampDeletion], actor, at, None)
    }

    /// Apply to an in-memory copy of a row. Callers check the guard first.
    pub fn apply_to(&self, record: &mut ReviewableRecord) {
        match self.next {
            NextState::Status(status) => record.status = status,
            NextState::SoftDeleted => {
                record.deleted_at = Some(self.at);
                record.deleted_by = Some(self.actor.clone());
            }
        }

        match &self.rejection_note {
            NoteUpdate::Keep => {}
            NoteUpdate::Clear => record.rejection_note = None,
            NoteUpdate::Set(note) => record.rejection_note = Some(note.clone()),
        }

        if self.stamp_kasi_approval && record.approved_by_kasi_at.is_none() {
            record.approved_by_kasi_at = Some(self.at);
        }
        if self.stamp_cdk_approval && record.approved_by_cdk_at.is_none() {
            record.approved_by_cdk_at = Some(self.at);
        }

        record.updated_by = Some(self.actor.clone());
        record.updated_at = self.at;
    }
}

/// Input for creating a draft report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub year: i32,
    pub created_by: String,
}

/// Listing parameters. Soft-deleted rows are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<ReportStatus>,
    pub year: Option<i32>,
    pub order: Vec<OrderTerm>,
    pub limit: Option<u32>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_draft(
        &self,
        record_type: &RecordType,
        new: NewRecord,
    ) -> Result<ReviewableRecord, StoreError>;

    /// Load a record including soft-deleted ones.
    async fn load(
        &self,
        record_type: &RecordType,
        id: RecordId,
    ) -> Result<Option<ReviewableRecord>, StoreError>;

    /// Conditional multi-row update. Unknown ids, deleted rows and rows whose
    /// status the guard rejects are skipped. Returns rows actually changed.
    async fn update_where(
        &self,
        record_type: &RecordType,
        ids: &[RecordId],
        guard: &StatusGuard,
        update: &RecordUpdate,
    ) -> Result<u64, StoreError>;

    async fn list(
        &self,
        record_type: &RecordType,
        query: &ListQuery,
    ) -> Result<Vec<ReviewableRecord>, StoreError>;

    /// Conditional single-row update.
    async fn update_one_where(
        &self,
        record_type: &RecordType,
        id: RecordId,
        guard: &StatusGuard,
        update: &RecordUpdate,
    ) -> Result<bool, StoreError> {
        Ok(self.update_where(record_type, &[id], guard, update).await? == 1)
    }

    async fn soft_delete(
        &self,
        record_type: &RecordType,
        ids: &[RecordId],
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let update = RecordUpdate::soft_delete(actor, at);
        self.update_where(record_type, ids, &StatusGuard::Any, &update)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: ReportStatus) -> ReviewableRecord {
        let now = Utc::now();
        ReviewableRecord {
            id: 1,
            year: 2024,
            status,
            rejection_note: None,
            approved_by_kasi_at: None,
            approved_by_cdk_at: None,
            created_by: "op".to_string(),
            updated_by: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
        }
    }

    #[test]
    fn test_reject_update_sets_note() {
        let update = RecordUpdate::from_effects(
            NextState::Status(ReportStatus::Rejected),
            &[Effect::SetRejectionNote],
            "k-1",
            Utc::now(),
            Some("area figures missing"),
        );
        let mut row = record(ReportStatus::WaitingKasi);
        update.apply_to(&mut row);

        assert_eq!(row.status, ReportStatus::Rejected);
        assert_eq!(row.rejection_note.as_deref(), Some("area figures missing"));
        assert_eq!(row.updated_by.as_deref(), Some("k-1"));
    }

    #[test]
    fn test_approval_stamp_is_set_once() {
        let first = Utc::now() - chrono::Duration::days(3);
        let mut row = record(ReportStatus::WaitingKasi);
        row.approved_by_kasi_at = Some(first);

        let update = RecordUpdate::from_effects(
            NextState::Status(ReportStatus::WaitingCdk),
            &[Effect::StampKasiApproval],
            "k-1",
            Utc::now(),
            None,
        );
        update.apply_to(&mut row);

        assert_eq!(row.approved_by_kasi_at, Some(first));
        assert_eq!(row.status, ReportStatus::WaitingCdk);
    }

    #[test]
    fn test_soft_delete_keeps_status() {
        let mut row = record(ReportStatus::Final);
        RecordUpdate::soft_delete("admin", Utc::now()).apply_to(&mut row);

        assert_eq!(row.status, ReportStatus::Final);
        assert!(row.is_deleted());
        assert_eq!(row.deleted_by.as_deref(), Some("admin"));
    }

    #[test]
    fn test_guard() {
        let guard = StatusGuard::OneOf(vec![ReportStatus::Draft, ReportStatus::Rejected]);
        assert!(guard.accepts(ReportStatus::Rejected));
        assert!(!guard.accepts(ReportStatus::WaitingKasi));
        assert!(StatusGuard::Any.accepts(ReportStatus::Final));
    }
}
