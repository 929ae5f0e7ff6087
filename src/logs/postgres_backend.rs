//! PostgreSQL-based outcome log backend.
//!
//! Rows live in the `mailroom_logs` table. The backend only ever issues
//! inserts and filtered selects; there is no update or delete path.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::metrics::LOG_APPENDS_TOTAL;

use super::backend::{LogStoreBackend, LogStoreError};
use super::models::{LogEntry, LogFilter, LogStatus, NewLogEntry, Pagination};

/// PostgreSQL-based outcome log backend.
///
/// Table structure:
/// - `mailroom_logs` - append-only log, `seq` breaks created_at ties
pub struct PostgresLogStore {
    pool: PgPool,
}

impl PostgresLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the log table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), LogStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mailroom_logs (
                id UUID PRIMARY KEY,
                seq BIGSERIAL,
                trigger TEXT NOT NULL,
                template_id TEXT NOT NULL,
                subject TEXT NOT NULL,
                to_addrs TEXT[] NOT NULL,
                cc_addrs TEXT[] NOT NULL,
                bcc_addrs TEXT[] NOT NULL,
                status TEXT NOT NULL,
                error_message TEXT,
                attempts INT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS mailroom_logs_created_at_idx ON mailroom_logs (created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &LogFilter) {
        qb.push(" WHERE TRUE");
        if let Some(trigger) = &filter.trigger {
            qb.push(" AND trigger = ").push_bind(trigger.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(until) = filter.until {
            qb.push(" AND created_at < ").push_bind(until);
        }
    }

    fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<LogEntry, LogStoreError> {
        let status_raw: String = row.try_get("status")?;
        let status = LogStatus::parse(&status_raw).ok_or_else(|| {
            LogStoreError::InvalidEntry(format!("Unknown status in log row: {}", status_raw))
        })?;
        let attempts: i32 = row.try_get("attempts")?;

        Ok(LogEntry {
            id: row.try_get("id")?,
            trigger: row.try_get("trigger")?,
            template_id: row.try_get("template_id")?,
            subject: row.try_get("subject")?,
            to: row.try_get("to_addrs")?,
            cc: row.try_get("cc_addrs")?,
            bcc: row.try_get("bcc_addrs")?,
            status,
            error_message: row.try_get("error_message")?,
            attempts: attempts as u32,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl LogStoreBackend for PostgresLogStore {
    async fn append(&self, entry: NewLogEntry) -> Result<Uuid, LogStoreError> {
        entry.validate().map_err(LogStoreError::InvalidEntry)?;

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO mailroom_logs
                (id, trigger, template_id, subject, to_addrs, cc_addrs, bcc_addrs,
                 status, error_message, attempts)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(&entry.trigger)
        .bind(&entry.template_id)
        .bind(&entry.subject)
        .bind(&entry.to)
        .bind(&entry.cc)
        .bind(&entry.bcc)
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .bind(entry.attempts as i32)
        .execute(&self.pool)
        .await?;

        LOG_APPENDS_TOTAL.inc();

        tracing::trace!(log_id = %id, "Appended outcome log row to PostgreSQL");
        Ok(id)
    }

    async fn query(
        &self,
        filter: &LogFilter,
        pagination: &Pagination,
    ) -> Result<Vec<LogEntry>, LogStoreError> {
        let mut qb = QueryBuilder::new(
            "SELECT id, trigger, template_id, subject, to_addrs, cc_addrs, bcc_addrs, \
             status, error_message, attempts, created_at FROM mailroom_logs",
        );
        Self::push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at ASC, seq ASC");
        qb.push(" LIMIT ").push_bind(pagination.limit as i64);
        qb.push(" OFFSET ").push_bind(pagination.offset as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn count(&self, filter: &LogFilter) -> Result<u64, LogStoreError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) AS total FROM mailroom_logs");
        Self::push_filter(&mut qb, filter);

        let row = qb.build().fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total as u64)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
