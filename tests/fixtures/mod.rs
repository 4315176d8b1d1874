//! Shared fixtures for workflow integration tests: actors, seeded records and
//! hooks that record what they were asked to do.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

use report_review::error::HookError;
use report_review::workflow::record::REFORESTATION;
use report_review::workflow::{
    AuditEntry, AuditLog, CacheInvalidator, CacheScope, Principal, RecordId, RecordType,
    ReportStatus, ReviewableRecord, Role, WorkflowHooks,
};
use report_review::{MemoryStore, ReviewEngine};

pub const MODULE: &RecordType = &REFORESTATION;

pub fn operator() -> Principal {
    Principal::new("operator-1")
        .with_role(Role::Operator)
        .with_permissions(["reforestation.edit", "reforestation.delete"])
}

pub fn kasi() -> Principal {
    Principal::new("kasi-1")
        .with_role(Role::Kasi)
        .with_permissions(["reforestation.approve"])
}

pub fn kacdk() -> Principal {
    Principal::new("kacdk-1")
        .with_role(Role::Kacdk)
        .with_permissions(["reforestation.approve"])
}

pub fn admin() -> Principal {
    Principal::new("admin-1").with_role(Role::Admin)
}

/// An actor holding `role` and every reforestation permission, so only the
/// transition table decides.
pub fn fully_permitted(role: Role) -> Principal {
    Principal::new(format!("{role}-full"))
        .with_role(role)
        .with_permissions([
            "reforestation.edit",
            "reforestation.approve",
            "reforestation.delete",
        ])
}

/// A record in `status` whose review columns are consistent with having
/// reached that status through the workflow.
pub fn record(id: RecordId, status: ReportStatus, year: i32) -> ReviewableRecord {
    let created = Utc::now() - Duration::days(10);
    let kasi_at = matches!(status, ReportStatus::WaitingCdk | ReportStatus::Final)
        .then(|| created + Duration::days(1));
    let cdk_at = (status == ReportStatus::Final).then(|| created + Duration::days(2));

    ReviewableRecord {
        id,
        year,
        status,
        rejection_note: (status == ReportStatus::Rejected).then(|| "incomplete".to_string()),
        approved_by_kasi_at: kasi_at,
        approved_by_cdk_at: cdk_at,
        created_by: "operator-1".to_string(),
        updated_by: None,
        created_at: created + Duration::minutes(id),
        updated_at: created,
        deleted_at: None,
        deleted_by: None,
    }
}

pub async fn seed(store: &MemoryStore, id: RecordId, status: ReportStatus, year: i32) -> ReviewableRecord {
    let row = record(id, status, year);
    store.put(MODULE, row.clone()).await;
    row
}

pub async fn current(store: &MemoryStore, id: RecordId) -> ReviewableRecord {
    use report_review::RecordStore;
    store
        .load(MODULE, id)
        .await
        .expect("load failed")
        .expect("record missing")
}

#[derive(Debug, Default)]
pub struct RecordingCache {
    pub calls: Mutex<Vec<(String, CacheScope)>>,
    pub fail: bool,
}

impl RecordingCache {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, CacheScope)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingCache {
    async fn invalidate(&self, record_type: &RecordType, scope: CacheScope) -> Result<(), HookError> {
        self.calls
            .lock()
            .unwrap()
            .push((record_type.key.to_string(), scope));
        if self.fail {
            return Err(HookError::Cache("cache backend unreachable".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingAudit {
    pub entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAudit {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLog for RecordingAudit {
    async fn append(&self, entry: AuditEntry) -> Result<(), HookError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<RecordingCache>,
    pub audit: Arc<RecordingAudit>,
    pub engine: ReviewEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_cache(RecordingCache::default())
    }

    pub fn with_cache(cache: RecordingCache) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(cache);
        let audit = Arc::new(RecordingAudit::default());
        let engine = ReviewEngine::new(
            store.clone(),
            WorkflowHooks::new(cache.clone(), audit.clone()),
        );
        Self {
            store,
            cache,
            audit,
            engine,
        }
    }
}
