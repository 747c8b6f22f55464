//! Pagination checkpoint table.
//!
//! The table is ingestion bookkeeping rather than part of the staging schema,
//! so it is created on first use.

use fhirstage_core::ResourceKind;
use fhirstage_storage::Checkpoint;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgConnection;
use tracing::debug;

use crate::error::{PostgresError, Result};

pub const CHECKPOINT_TABLE: &str = "fhirstage_ingest_checkpoint";

pub async fn ensure_table(conn: &mut PgConnection) -> Result<()> {
    let sql = format!(
        r#"CREATE TABLE IF NOT EXISTS "{CHECKPOINT_TABLE}" (
               resource_kind TEXT PRIMARY KEY,
               next_url TEXT NOT NULL,
               pages_completed BIGINT NOT NULL,
               updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
           )"#
    );
    query(&sql)
        .execute(&mut *conn)
        .await
        .map_err(PostgresError::Checkpoint)?;
    debug!(table = CHECKPOINT_TABLE, "Checkpoint table ready");
    Ok(())
}

pub async fn load(conn: &mut PgConnection, kind: ResourceKind) -> Result<Option<Checkpoint>> {
    let sql = format!(
        r#"SELECT next_url, pages_completed FROM "{CHECKPOINT_TABLE}" WHERE resource_kind = $1"#
    );
    let row: Option<(String, i64)> = query_as(&sql)
        .bind(kind.resource_type())
        .fetch_optional(&mut *conn)
        .await
        .map_err(PostgresError::Checkpoint)?;

    Ok(row.map(|(next_url, pages)| Checkpoint::new(kind, next_url, pages.max(0) as u64)))
}

pub async fn save(conn: &mut PgConnection, checkpoint: &Checkpoint) -> Result<()> {
    let sql = format!(
        r#"INSERT INTO "{CHECKPOINT_TABLE}" (resource_kind, next_url, pages_completed, updated_at)
           VALUES ($1, $2, $3, now())
           ON CONFLICT (resource_kind) DO UPDATE
           SET next_url = EXCLUDED.next_url,
               pages_completed = EXCLUDED.pages_completed,
               updated_at = EXCLUDED.updated_at"#
    );
    query(&sql)
        .bind(checkpoint.kind.resource_type())
        .bind(&checkpoint.next_url)
        .bind(checkpoint.pages_completed as i64)
        .execute(&mut *conn)
        .await
        .map_err(PostgresError::Checkpoint)?;
    Ok(())
}

pub async fn clear(conn: &mut PgConnection, kind: ResourceKind) -> Result<()> {
    let sql = format!(r#"DELETE FROM "{CHECKPOINT_TABLE}" WHERE resource_kind = $1"#);
    query(&sql)
        .bind(kind.resource_type())
        .execute(&mut *conn)
        .await
        .map_err(PostgresError::Checkpoint)?;
    Ok(())
}
