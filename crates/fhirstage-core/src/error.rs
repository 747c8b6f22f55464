use thiserror::Error;

/// Core error types for record handling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown resource kind: {0}")]
    UnknownResourceKind(String),

    #[error("Malformed record {resource}: missing {path}")]
    MalformedRecord { resource: String, path: String },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}

impl CoreError {
    /// Create a new UnknownResourceKind error
    pub fn unknown_resource_kind(selector: impl Into<String>) -> Self {
        Self::UnknownResourceKind(selector.into())
    }

    /// Create a new MalformedRecord error naming the missing JSON path
    pub fn malformed(resource: impl Into<String>, path: impl Into<String>) -> Self {
        Self::MalformedRecord {
            resource: resource.into(),
            path: path.into(),
        }
    }

    /// Create a new InvalidReference error
    pub fn invalid_reference(reason: impl Into<String>) -> Self {
        Self::InvalidReference(reason.into())
    }

    /// Whether the error concerns a single record rather than the run as a whole
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRecord { .. } | Self::InvalidReference(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownResourceKind(_) => ErrorCategory::Usage,
            Self::MalformedRecord { .. } | Self::InvalidReference(_) => ErrorCategory::Validation,
        }
    }
}

/// Error categories for log classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Usage,
    Validation,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage => write!(f, "usage"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
