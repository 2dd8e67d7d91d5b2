//! Store adapter for the agent session mirror.
//!
//! Every primitive runs in its own transaction. A failed statement drops the
//! transaction, which rolls it back, before the error is returned.

use async_trait::async_trait;
use queuewatch_core::classify::{LoginIntent, LogoffIntent, StatusIntent};
use queuewatch_core::QueuewatchError;
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert unless a row with the same session id exists.
    /// Returns `true` when a row was written.
    async fn insert_if_absent(&self, login: &LoginIntent) -> Result<bool, QueuewatchError>;

    /// Delete every row for `(queue, extension)`. Returns the number removed.
    async fn delete_by_key(&self, logoff: &LogoffIntent) -> Result<u64, QueuewatchError>;

    /// Overwrite counters for the `(queue, extension)` row. Returns the
    /// number of rows changed; nothing is committed when it is zero.
    async fn update_if_exists(&self, status: &StatusIntent) -> Result<u64, QueuewatchError>;
}

/// PostgreSQL-backed store. Owns the single-connection pool created at
/// startup; call [`close`](Self::close) on shutdown.
///
/// The table is created on first use and retried on every call until that
/// succeeds, so a database that was down at startup is usable once it
/// comes back.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    table: String,
    schema_ready: Arc<AtomicBool>,
}

impl PgSessionStore {
    /// `table` must be a validated identifier (see `ServiceConfig::table`).
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            schema_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema_ready(&self) -> bool {
        self.schema_ready.load(Ordering::Acquire)
    }

    /// Create the table if that has not succeeded yet.
    pub async fn ensure_schema(&self) -> Result<(), QueuewatchError> {
        if self.schema_ready() {
            return Ok(());
        }
        queuewatch_core::db::ensure_schema(&self.pool, &self.table).await?;
        self.schema_ready.store(true, Ordering::Release);
        tracing::info!(table = %self.table, "Agent session table ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert_if_absent(&self, login: &LoginIntent) -> Result<bool, QueuewatchError> {
        self.ensure_schema().await?;
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO {} (
                session_id, queue, agent, extension, calls_taken, last_call, status, logged_since
            ) VALUES ($1, $2, $3, $4, 0, NULL, 1, to_timestamp($5::float8))
            ON CONFLICT (session_id) DO NOTHING
            "#,
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(&login.session_id)
            .bind(&login.queue)
            .bind(&login.agent)
            .bind(&login.extension)
            .bind(login.logged_since)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_key(&self, logoff: &LogoffIntent) -> Result<u64, QueuewatchError> {
        self.ensure_schema().await?;
        let mut tx = self.pool.begin().await?;

        let sql = format!("DELETE FROM {} WHERE queue = $1 AND extension = $2", self.table);
        let result = sqlx::query(&sql)
            .bind(&logoff.queue)
            .bind(&logoff.extension)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn update_if_exists(&self, status: &StatusIntent) -> Result<u64, QueuewatchError> {
        self.ensure_schema().await?;
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE {}
            SET queue = $1,
                calls_taken = $2,
                last_call = to_timestamp($3::float8),
                status = $4
            WHERE queue = $1 AND extension = $5
            "#,
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(&status.queue)
            .bind(status.calls_taken)
            .bind(status.last_call)
            .bind(status.status)
            .bind(&status.extension)
            .execute(&mut *tx)
            .await?;

        let affected = result.rows_affected();
        if affected == 0 {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }
        Ok(affected)
    }
}
