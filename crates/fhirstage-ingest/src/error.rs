use std::fmt;

use fhirstage_client::FetchError;
use fhirstage_core::CoreError;
use fhirstage_storage::StorageError;

use crate::progress::Progress;

/// Pipeline stage an error escaped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Normalize,
    Write,
    Checkpoint,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "Fetch",
            Self::Normalize => "Normalize",
            Self::Write => "Write",
            Self::Checkpoint => "Checkpoint",
        };
        f.write_str(name)
    }
}

/// Underlying cause of an aborted run.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Record(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("page limit of {max_pages} reached before the last page")]
    PageLimit { max_pages: u64 },

    #[error("interrupted")]
    Interrupted,
}

/// An ingestion run stopped before reaching the last page.
///
/// Pages written before the failure stay committed.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed after {pages_completed} page(s): {source}")]
pub struct IngestError {
    pub stage: Stage,
    /// Pages fully written by this run.
    pub pages_completed: u64,
    #[source]
    pub source: StageError,
}

impl IngestError {
    pub fn new(stage: Stage, pages_completed: u64, source: impl Into<StageError>) -> Self {
        Self {
            stage,
            pages_completed,
            source: source.into(),
        }
    }

    /// A run cancelled from outside at the given position.
    pub fn interrupted(progress: Progress) -> Self {
        Self::new(progress.stage, progress.pages_completed, StageError::Interrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = IngestError::new(
            Stage::Write,
            2,
            StorageError::write("staging_patient", "connection reset"),
        );
        assert_eq!(
            err.to_string(),
            "Write stage failed after 2 page(s): Write to staging_patient failed: connection reset"
        );
    }

    #[test]
    fn test_page_limit_display() {
        let err = IngestError::new(Stage::Fetch, 5, StageError::PageLimit { max_pages: 5 });
        assert_eq!(
            err.to_string(),
            "Fetch stage failed after 5 page(s): page limit of 5 reached before the last page"
        );
    }

    #[test]
    fn test_interrupted_names_stage_and_pages() {
        let err = IngestError::interrupted(Progress::new(Stage::Write, 3));
        assert_eq!(err.stage, Stage::Write);
        assert_eq!(err.pages_completed, 3);
        assert_eq!(err.to_string(), "Write stage failed after 3 page(s): interrupted");
    }
}
