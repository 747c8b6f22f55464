//! Storage error types for the staging store abstraction.

use std::fmt;

/// Errors that can occur while writing to a staging store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A bulk write statement failed.
    #[error("Write to {table} failed: {message}")]
    Write {
        /// Destination table.
        table: String,
        /// Description of the failure.
        message: String,
    },

    /// Reading or persisting the pagination checkpoint failed.
    #[error("Checkpoint error: {message}")]
    Checkpoint {
        /// Description of the failure.
        message: String,
    },

    /// An operation did not finish within its deadline.
    #[error("{operation} timed out after {after_ms} ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline in milliseconds.
        after_ms: u64,
    },

    /// Failed to connect to the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Write` error.
    #[must_use]
    pub fn write(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Checkpoint` error.
    #[must_use]
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, after_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms,
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Write { .. } => ErrorCategory::Write,
            Self::Checkpoint { .. } => ErrorCategory::Checkpoint,
            Self::Timeout { .. } | Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bulk write failure.
    Write,
    /// Checkpoint bookkeeping failure.
    Checkpoint,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Checkpoint => write!(f, "checkpoint"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::write("staging_patient", "constraint violated");
        assert_eq!(
            err.to_string(),
            "Write to staging_patient failed: constraint violated"
        );

        let err = StorageError::timeout("insert into staging_patient_obs", 5000);
        assert_eq!(
            err.to_string(),
            "insert into staging_patient_obs timed out after 5000 ms"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StorageError::write("t", "m").category(),
            ErrorCategory::Write
        );
        assert_eq!(
            StorageError::checkpoint("m").category(),
            ErrorCategory::Checkpoint
        );
        assert_eq!(
            StorageError::connection_error("refused").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            StorageError::internal("m").category(),
            ErrorCategory::Internal
        );
    }
}
