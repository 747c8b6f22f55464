//! Error types for the PostgreSQL staging store.

use fhirstage_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// PostgreSQL error code for a second update of the same row by one
/// `ON CONFLICT DO UPDATE` statement (21000, cardinality_violation).
pub const PG_CARDINALITY_VIOLATION: &str = "21000";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is "undefined table" (42P01).
pub fn is_undefined_table(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNDEFINED_TABLE)
}

/// Errors specific to the PostgreSQL staging store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// A write statement against a staging table failed.
    #[error("Write to {table} failed: {source}")]
    Write {
        table: String,
        #[source]
        source: SqlxError,
    },

    /// Checkpoint bookkeeping failed.
    #[error("Checkpoint error: {0}")]
    Checkpoint(SqlxError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new write error for `table`.
    #[must_use]
    pub fn write(table: impl Into<String>, source: SqlxError) -> Self {
        Self::Write {
            table: table.into(),
            source,
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Write { table, source } => {
                let message = if is_undefined_table(&source) {
                    format!("{source} (staging tables are not created by fhirstage)")
                } else if has_pg_error_code(&source, PG_CARDINALITY_VIOLATION) {
                    format!("{source} (batch repeats a conflict key)")
                } else {
                    source.to_string()
                };
                StorageError::write(table, message)
            }
            PostgresError::Checkpoint(e) => StorageError::checkpoint(e.to_string()),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));

        let err = PostgresError::write("staging_patient", SqlxError::RowNotFound);
        assert!(err.to_string().starts_with("Write to staging_patient failed"));
    }

    #[test]
    fn test_conversion_to_storage_error() {
        let storage_err: StorageError =
            PostgresError::write("staging_patient_obs", SqlxError::PoolTimedOut).into();
        assert!(matches!(
            storage_err,
            StorageError::Write { ref table, .. } if table == "staging_patient_obs"
        ));

        let storage_err: StorageError = PostgresError::Connection(SqlxError::PoolClosed).into();
        assert!(matches!(storage_err, StorageError::ConnectionError { .. }));
    }

    #[test]
    fn test_non_database_errors_have_no_code() {
        assert!(!has_pg_error_code(&SqlxError::RowNotFound, PG_UNDEFINED_TABLE));
    }
}
