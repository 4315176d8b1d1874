// Post-transition hooks: derived-cache invalidation and audit append.
//
// Both run only after the conditional update committed. Their failures are
// logged and swallowed; they never undo a transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::principal::Principal;
use super::record::{RecordId, RecordType};
use super::status::{ReportStatus, ReviewAction};
use super::transitions::NextState;
use crate::error::HookError;

/// Which cached aggregates of a record type are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    Year(i32),
    AllYears,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, record_type: &RecordType, scope: CacheScope) -> Result<(), HookError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub actor: String,
    pub action: ReviewAction,
    pub record_type: String,
    pub record_ids: Vec<RecordId>,
    /// Rows actually transitioned.
    pub changed: u64,
    /// Prior status, known for single-record transitions only.
    pub from: Option<ReportStatus>,
    pub to: Option<NextState>,
    pub at: DateTime<Utc>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), HookError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl CacheInvalidator for NoopCache {
    async fn invalidate(&self, _record_type: &RecordType, _scope: CacheScope) -> Result<(), HookError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAudit;

#[async_trait]
impl AuditLog for NoopAudit {
    async fn append(&self, _entry: AuditEntry) -> Result<(), HookError> {
        Ok(())
    }
}

/// The pair of hooks shared by both executors.
#[derive(Clone)]
pub struct WorkflowHooks {
    cache: Arc<dyn CacheInvalidator>,
    audit: Arc<dyn AuditLog>,
}

impl Default for WorkflowHooks {
    fn default() -> Self {
        Self::new(Arc::new(NoopCache), Arc::new(NoopAudit))
    }
}

impl WorkflowHooks {
    pub fn new(cache: Arc<dyn CacheInvalidator>, audit: Arc<dyn AuditLog>) -> Self {
        Self { cache, audit }
    }

    /// Fire both hooks for a committed transition.
    pub async fn after_transition(
        &self,
        record_type: &RecordType,
        scope: CacheScope,
        actor: &Principal,
        entry: AuditEntry,
    ) {
        if let Err(e) = self.cache.invalidate(record_type, scope).await {
            warn!(
                record_type = %record_type.key,
                scope = ?scope,
                error = %e,
                "Cache invalidation failed after committed transition"
            );
        }

        if let Err(e) = self.audit.append(entry).await {
            warn!(
                record_type = %record_type.key,
                actor = %actor.id(),
                error = %e,
                "Audit append failed after committed transition"
            );
        }
    }
}
