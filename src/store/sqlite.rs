// SQLite-backed record store. Each transition is one conditional UPDATE, so
// concurrent reviewers race on the database rather than on application locks.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use tracing::info;

use super::{ListQuery, NewRecord, NoteUpdate, RecordStore, RecordUpdate, StatusGuard};
use crate::error::StoreError;
use crate::workflow::ordering;
use crate::workflow::record::{RecordId, RecordType, ReviewableRecord};
use crate::workflow::status::ReportStatus;
use crate::workflow::transitions::NextState;

const REVIEW_COLUMNS: &str = "id, year, rejection_note, approved_by_kasi_at, approved_by_cdk_at, \
     created_by, updated_by, created_at, updated_at, deleted_at, deleted_by";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database and optionally run migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        auto_migrate: bool,
    ) -> Result<Self, StoreError> {
        if !Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        if auto_migrate {
            store.migrate().await?;
        }
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }

    fn select_sql(record_type: &RecordType) -> String {
        format!(
            "SELECT {REVIEW_COLUMNS}, {status} AS status FROM {table}",
            status = record_type.status_column,
            table = record_type.table
        )
    }
}

fn record_from_row(record_type: &RecordType, row: &SqliteRow) -> Result<ReviewableRecord, StoreError> {
    let id: i64 = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<ReportStatus>()
        .map_err(|e| StoreError::CorruptRow {
            table: record_type.table.to_string(),
            id,
            reason: e.to_string(),
        })?;

    Ok(ReviewableRecord {
        id,
        year: row.try_get("year")?,
        status,
        rejection_note: row.try_get("rejection_note")?,
        approved_by_kasi_at: row.try_get("approved_by_kasi_at")?,
        approved_by_cdk_at: row.try_get("approved_by_cdk_at")?,
        created_by: row.try_get("created_by")?,
        updated_by: row.try_get("updated_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
        deleted_by: row.try_get("deleted_by")?,
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create_draft(
        &self,
        record_type: &RecordType,
        new: NewRecord,
    ) -> Result<ReviewableRecord, StoreError> {
        let now = chrono::Utc::now();
        let sql = format!(
            "INSERT INTO {table} (year, {status}, created_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
            table = record_type.table,
            status = record_type.status_column
        );

        let id = sqlx::query(&sql)
            .bind(new.year)
            .bind(ReportStatus::Draft.as_str())
            .bind(&new.created_by)
            .bind(now)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        self.load(record_type, id)
            .await?
            .ok_or_else(|| StoreError::CorruptRow {
                table: record_type.table.to_string(),
                id,
                reason: "inserted row not readable".to_string(),
            })
    }

    async fn load(
        &self,
        record_type: &RecordType,
        id: RecordId,
    ) -> Result<Option<ReviewableRecord>, StoreError> {
        let sql = format!("{} WHERE id = ?1", Self::select_sql(record_type));
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| record_from_row(record_type, &row)).transpose()
    }

    async fn update_where(
        &self,
        record_type: &RecordType,
        ids: &[RecordId],
        guard: &StatusGuard,
        update: &RecordUpdate,
    ) -> Result<u64, StoreError> {
        let ids: BTreeSet<RecordId> = ids.iter().copied().collect();
        if ids.is_empty() || matches!(guard, StatusGuard::OneOf(expected) if expected.is_empty()) {
            return Ok(0);
        }

        let status_column = record_type.status_column;
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("UPDATE {} SET ", record_type.table));

        {
            let mut set = builder.separated(", ");
            match update.next {
                NextState::Status(status) => {
                    set.push(format!("{status_column} = "));
                    set.push_bind_unseparated(status.as_str());
                }
                NextState::SoftDeleted => {
                    set.push("deleted_at = ");
                    set.push_bind_unseparated(update.at);
                    set.push("deleted_by = ");
                    set.push_bind_unseparated(update.actor.clone());
                }
            }

            match &update.rejection_note {
                NoteUpdate::Keep => {}
                NoteUpdate::Clear => {
                    set.push("rejection_note = NULL");
                }
                NoteUpdate::Set(note) => {
                    set.push("rejection_note = ");
                    set.push_bind_unseparated(note.clone());
                }
            }

            if update.stamp_kasi_approval {
                set.push("approved_by_kasi_at = COALESCE(approved_by_kasi_at, ");
                set.push_bind_unseparated(update.at);
                set.push_unseparated(")");
            }
            if update.stamp_cdk_approval {
                set.push("approved_by_cdk_at = COALESCE(approved_by_cdk_at, ");
                set.push_bind_unseparated(update.at);
                set.push_unseparated(")");
            }

            set.push("updated_by = ");
            set.push_bind_unseparated(update.actor.clone());
            set.push("updated_at = ");
            set.push_bind_unseparated(update.at);
        }

        builder.push(" WHERE deleted_at IS NULL AND id IN (");
        {
            let mut list = builder.separated(", ");
            for id in &ids {
                list.push_bind(*id);
            }
        }
        builder.push(")");

        if let StatusGuard::OneOf(expected) = guard {
            builder.push(format!(" AND {status_column} IN ("));
            {
                let mut list = builder.separated(", ");
                for status in expected {
                    list.push_bind(status.as_str());
                }
            }
            builder.push(")");
        }

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn list(
        &self,
        record_type: &RecordType,
        query: &ListQuery,
    ) -> Result<Vec<ReviewableRecord>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(Self::select_sql(record_type));
        builder.push(" WHERE deleted_at IS NULL");

        if let Some(status) = query.status {
            builder.push(format!(" AND {} = ", record_type.status_column));
            builder.push_bind(status.as_str());
        }
        if let Some(year) = query.year {
            builder.push(format!(" AND {} = ", record_type.grouping_column));
            builder.push_bind(year);
        }

        builder.push(ordering::to_sql(&query.order, record_type.status_column));

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::from(limit));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| record_from_row(record_type, row))
            .collect()
    }
}
