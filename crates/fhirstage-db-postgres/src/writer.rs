//! Bulk insert and upsert statements for the staging tables.
//!
//! One page is written with one multi-row statement. Values are always bound
//! as parameters. A batch whose bind count exceeds the PostgreSQL protocol
//! limit is split into several statements run inside one transaction, so a
//! page is still written atomically.

use fhirstage_core::{ObservationRecord, PatientRecord};
use sqlx_core::connection::Connection;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_postgres::{PgConnection, Postgres};
use tracing::{debug, instrument};

use crate::error::{PostgresError, Result};

/// Maximum number of bind parameters in one PostgreSQL statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// A destination column and the SQL type its parameter is cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub cast: Option<&'static str>,
}

impl Column {
    pub const fn new(name: &'static str) -> Self {
        Self { name, cast: None }
    }

    pub const fn cast(name: &'static str, cast: &'static str) -> Self {
        Self {
            name,
            cast: Some(cast),
        }
    }
}

/// Shape of a staging table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Unique column targeted by `ON CONFLICT`; `None` means append-only.
    pub conflict_key: Option<&'static str>,
}

impl TableSpec {
    /// Rows per statement that stay under [`MAX_BIND_PARAMS`].
    pub fn rows_per_statement(&self) -> usize {
        (MAX_BIND_PARAMS / self.columns.len().max(1)).max(1)
    }
}

pub const PATIENT_TABLE: TableSpec = TableSpec {
    name: "staging_patient",
    columns: &[
        Column::new("case_id"),
        Column::new("sex"),
        Column::cast("date_of_birth", "date"),
        Column::new("deceased"),
        Column::new("date_of_death"),
        Column::new("facility_id"),
    ],
    conflict_key: Some("case_id"),
};

pub const OBSERVATION_TABLE: TableSpec = TableSpec {
    name: "staging_patient_obs",
    columns: &[
        Column::new("case_id"),
        Column::new("encounter_id"),
        Column::new("concept_uuid"),
        Column::new("concept_name"),
        Column::new("concept_value"),
        Column::new("effective_date"),
    ],
    conflict_key: None,
};

/// A bindable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Bool(Option<bool>),
}

/// A record that maps onto a staging table row.
pub trait StagingRow {
    /// Values in the column order of the row's [`TableSpec`].
    fn values(&self) -> Vec<SqlValue>;
}

impl StagingRow for PatientRecord {
    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(Some(self.case_id.clone())),
            SqlValue::Text(Some(self.sex.clone())),
            SqlValue::Text(Some(self.date_of_birth.clone())),
            SqlValue::Bool(self.deceased),
            SqlValue::Text(self.date_of_death.clone()),
            SqlValue::Text(Some(self.facility_id.clone())),
        ]
    }
}

impl StagingRow for ObservationRecord {
    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(Some(self.patient_id.clone())),
            SqlValue::Text(Some(self.encounter_id.clone())),
            SqlValue::Text(Some(self.concept_code.clone())),
            SqlValue::Text(Some(self.concept_name.clone())),
            SqlValue::Text(self.concept_value.to_text()),
            SqlValue::Text(self.effective_date.clone()),
        ]
    }
}

/// Builds one multi-row statement for `rows`.
///
/// With `upsert`, every non-key column is overwritten from `EXCLUDED` on a
/// conflict with the table's key.
pub fn build_statement<R: StagingRow>(
    table: &TableSpec,
    rows: &[R],
    upsert: bool,
) -> QueryBuilder<'static, Postgres> {
    let column_list = table
        .columns
        .iter()
        .map(|c| format!(r#""{}""#, c.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut builder =
        QueryBuilder::<Postgres>::new(format!(r#"INSERT INTO "{}" ({column_list}) "#, table.name));

    builder.push_values(rows, |mut tuple, row| {
        for (column, value) in table.columns.iter().zip(row.values()) {
            match value {
                SqlValue::Text(v) => tuple.push_bind(v),
                SqlValue::Bool(v) => tuple.push_bind(v),
            };
            if let Some(cast) = column.cast {
                tuple.push_unseparated(format!("::{cast}"));
            }
        }
    });

    if upsert && let Some(key) = table.conflict_key {
        builder.push(conflict_clause(table, key));
    }

    builder
}

/// `ON CONFLICT ("key") DO UPDATE SET "col" = EXCLUDED."col", ...`
fn conflict_clause(table: &TableSpec, key: &str) -> String {
    let assignments = table
        .columns
        .iter()
        .filter(|c| c.name != key)
        .map(|c| format!(r#""{0}" = EXCLUDED."{0}""#, c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(r#" ON CONFLICT ("{key}") DO UPDATE SET {assignments}"#)
}

/// Inserts `rows`, updating existing rows on a conflict with the table key.
///
/// `rows` must not repeat a key. Returns the number of rows affected.
pub async fn upsert<R: StagingRow>(
    conn: &mut PgConnection,
    table: &TableSpec,
    rows: &[R],
) -> Result<u64> {
    if table.conflict_key.is_none() {
        return Err(PostgresError::config(format!(
            "table {} has no conflict key to upsert on",
            table.name
        )));
    }
    write(conn, table, rows, true).await
}

/// Appends `rows` without conflict handling. Returns the number of rows inserted.
pub async fn insert<R: StagingRow>(
    conn: &mut PgConnection,
    table: &TableSpec,
    rows: &[R],
) -> Result<u64> {
    write(conn, table, rows, false).await
}

#[instrument(skip(conn, rows), fields(table = table.name, rows = rows.len()))]
async fn write<R: StagingRow>(
    conn: &mut PgConnection,
    table: &TableSpec,
    rows: &[R],
    upsert: bool,
) -> Result<u64> {
    if rows.is_empty() {
        debug!("Empty batch, skipping write");
        return Ok(0);
    }

    let chunk_size = table.rows_per_statement();
    if rows.len() <= chunk_size {
        let mut builder = build_statement(table, rows, upsert);
        let result = builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| PostgresError::write(table.name, e))?;
        return Ok(result.rows_affected());
    }

    debug!(chunk_size, "Batch exceeds bind limit, writing in one transaction");
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| PostgresError::write(table.name, e))?;
    let mut affected = 0;
    for chunk in rows.chunks(chunk_size) {
        let mut builder = build_statement(table, chunk, upsert);
        let result = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| PostgresError::write(table.name, e))?;
        affected += result.rows_affected();
    }
    tx.commit()
        .await
        .map_err(|e| PostgresError::write(table.name, e))?;

    Ok(affected)
}
