//! Storage traits for the staging store abstraction.

use async_trait::async_trait;
use fhirstage_core::{ObservationRecord, PatientRecord, ResourceKind};

use crate::error::StorageError;
use crate::types::Checkpoint;

/// A destination store for canonical staging records.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Checks out a session that holds one connection until it is dropped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConnectionError` if no connection can be acquired.
    async fn open_session(&self) -> Result<Box<dyn StagingSession>, StorageError>;

    /// Returns the name of this backend, for logging.
    fn backend_name(&self) -> &'static str;
}

/// One checked-out connection to a staging store.
///
/// Dropping the session releases the connection.
#[async_trait]
pub trait StagingSession: Send {
    /// Inserts the batch into `staging_patient`, overwriting every non-key
    /// column of rows whose `case_id` already exists.
    ///
    /// The batch must not contain the same `case_id` twice. An empty batch
    /// performs no write and returns `0`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Write` if the statement fails.
    async fn upsert_patients(&mut self, records: &[PatientRecord]) -> Result<u64, StorageError>;

    /// Appends the batch to `staging_patient_obs`.
    ///
    /// No conflict handling: writing the same batch twice stores it twice.
    /// An empty batch performs no write and returns `0`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Write` if the statement fails.
    async fn insert_observations(
        &mut self,
        records: &[ObservationRecord],
    ) -> Result<u64, StorageError>;

    /// Loads the persisted pagination checkpoint for `kind`, if any.
    async fn load_checkpoint(
        &mut self,
        kind: ResourceKind,
    ) -> Result<Option<Checkpoint>, StorageError>;

    /// Persists the pagination checkpoint, replacing any previous one for its kind.
    async fn save_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), StorageError>;

    /// Removes the checkpoint for `kind` once a run has reached the last page.
    async fn clear_checkpoint(&mut self, kind: ResourceKind) -> Result<(), StorageError>;
}
