// In-process record store. One lock guards all tables, so every conditional
// update is atomic with respect to concurrent callers.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::Mutex;

use super::{ListQuery, NewRecord, RecordStore, RecordUpdate, StatusGuard};
use crate::error::StoreError;
use crate::workflow::ordering;
use crate::workflow::record::{RecordId, RecordType, ReviewableRecord};
use crate::workflow::status::ReportStatus;

#[derive(Debug, Default)]
struct Tables {
    next_id: RecordId,
    rows: HashMap<&'static str, BTreeMap<RecordId, ReviewableRecord>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row verbatim, bypassing the workflow. Used to seed
    /// fixtures in arbitrary states.
    pub async fn put(&self, record_type: &RecordType, record: ReviewableRecord) {
        let mut tables = self.tables.lock().await;
        tables.next_id = tables.next_id.max(record.id);
        tables
            .rows
            .entry(record_type.table)
            .or_default()
            .insert(record.id, record);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_draft(
        &self,
        record_type: &RecordType,
        new: NewRecord,
    ) -> Result<ReviewableRecord, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.next_id += 1;
        let now = Utc::now();
        let record = ReviewableRecord {
            id: tables.next_id,
            year: new.year,
            status: ReportStatus::Draft,
            rejection_note: None,
            approved_by_kasi_at: None,
            approved_by_cdk_at: None,
            created_by: new.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
        };
        tables
            .rows
            .entry(record_type.table)
            .or_default()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn load(
        &self,
        record_type: &RecordType,
        id: RecordId,
    ) -> Result<Option<ReviewableRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rows
            .get(record_type.table)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    async fn update_where(
        &self,
        record_type: &RecordType,
        ids: &[RecordId],
        guard: &StatusGuard,
        update: &RecordUpdate,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(rows) = tables.rows.get_mut(record_type.table) else {
            return Ok(0);
        };

        let unique: BTreeSet<RecordId> = ids.iter().copied().collect();
        let mut changed = 0;
        for id in unique {
            if let Some(row) = rows.get_mut(&id) {
                if !row.is_deleted() && guard.accepts(row.status) {
                    update.apply_to(row);
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn list(
        &self,
        record_type: &RecordType,
        query: &ListQuery,
    ) -> Result<Vec<ReviewableRecord>, StoreError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<ReviewableRecord> = tables
            .rows
            .get(record_type.table)
            .map(|rows| {
                rows.values()
                    .filter(|row| !row.is_deleted())
                    .filter(|row| query.status.map_or(true, |status| row.status == status))
                    .filter(|row| query.year.map_or(true, |year| row.year == year))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        ordering::sort_records(&mut records, &query.order);
        if let Some(limit) = query.limit {
            records.truncate(limit as usize);
        }
        Ok(records)
    }
}
