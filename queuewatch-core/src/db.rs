use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

const SCHEMA: &str = include_str!("../../migrations/0001_agent_sessions.sql");
const DEFAULT_TABLE: &str = "agent_sessions";

/// Single-connection pool, opened lazily so the process can start (and keep
/// draining events) while PostgreSQL is unreachable.
pub fn create_pool(config: &DatabaseConfig) -> PgPool {
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy_with(config.connect_options())
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

/// Schema DDL with the mirror table renamed to `table` (index included).
/// `table` must already be a validated identifier.
pub fn schema_sql(table: &str) -> String {
    SCHEMA.replace(DEFAULT_TABLE, table)
}

/// Create the mirror table and its lookup index if missing.
pub async fn ensure_schema(pool: &PgPool, table: &str) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(&schema_sql(table)).execute(pool).await?;
    Ok(())
}
