// Activity log sinks for committed workflow transitions

use async_trait::async_trait;
use tracing::info;

use crate::error::HookError;
use crate::workflow::hooks::{AuditEntry, AuditLog};

/// Writes audit entries to the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), HookError> {
        info!(
            target: "audit",
            actor = %entry.actor,
            action = %entry.action,
            record_type = %entry.record_type,
            record_ids = ?entry.record_ids,
            changed = entry.changed,
            from = ?entry.from,
            to = ?entry.to,
            "Report workflow activity"
        );
        Ok(())
    }
}

#[cfg(feature = "database")]
pub use sqlite::SqliteAuditLog;

#[cfg(feature = "database")]
mod sqlite {
    use super::*;
    use crate::error::StoreError;
    use sqlx::SqlitePool;

    /// Appends to the `activity_log` table.
    pub struct SqliteAuditLog {
        pool: SqlitePool,
    }

    impl SqliteAuditLog {
        pub fn new(pool: SqlitePool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl AuditLog for SqliteAuditLog {
        async fn append(&self, entry: AuditEntry) -> Result<(), HookError> {
            let record_ids = serde_json::to_string(&entry.record_ids)
                .map_err(|e| HookError::Audit(e.to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO activity_log
                    (actor, action, record_type, record_ids, changed, from_status, to_state, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&entry.actor)
            .bind(entry.action.as_str())
            .bind(&entry.record_type)
            .bind(record_ids)
            .bind(entry.changed as i64)
            .bind(entry.from.map(|status| status.as_str()))
            .bind(entry.to.map(|next| next.to_string()))
            .bind(entry.at)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

            Ok(())
        }
    }
}
