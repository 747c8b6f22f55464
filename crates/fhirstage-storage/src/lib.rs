//! # fhirstage-storage
//!
//! Destination-store abstraction for the staging pipeline.
//!
//! This crate defines the traits that staging backends implement and ships an
//! in-memory backend used for dry runs and tests. The PostgreSQL backend lives
//! in `fhirstage-db-postgres`.
//!
//! ## Overview
//!
//! A [`StagingStore`] hands out [`StagingSession`]s. A session owns one
//! connection for the duration of a resource-kind run and gives it back when
//! dropped, on every exit path.
//!
//! ## Example
//!
//! ```ignore
//! use fhirstage_storage::{StagingStore, StorageError};
//! use fhirstage_core::PatientRecord;
//!
//! async fn stage(store: &dyn StagingStore, batch: &[PatientRecord]) -> Result<u64, StorageError> {
//!     let mut session = store.open_session().await?;
//!     session.upsert_patients(batch).await
//! }
//! ```

mod error;
pub mod memory;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use memory::InMemoryStagingStore;
pub use traits::{StagingSession, StagingStore};
pub use types::Checkpoint;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable store.
pub type DynStagingStore = std::sync::Arc<dyn StagingStore>;
