//! PostgreSQL implementation of the StagingStore trait.

use async_trait::async_trait;
use fhirstage_core::{ObservationRecord, PatientRecord, ResourceKind};
use fhirstage_storage::{Checkpoint, StagingSession, StagingStore, StorageError};
use sqlx_core::pool::PoolConnection;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, instrument};

use crate::checkpoint;
use crate::config::PostgresConfig;
use crate::pool;
use crate::writer::{self, OBSERVATION_TABLE, PATIENT_TABLE};

/// PostgreSQL staging store.
#[derive(Debug, Clone)]
pub struct PostgresStagingStore {
    pool: PgPool,
}

impl PostgresStagingStore {
    /// Creates a new `PostgresStagingStore` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created or the
    /// database does not answer.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::connect_pool(&config).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StagingStore for PostgresStagingStore {
    #[instrument(skip(self))]
    async fn open_session(&self) -> Result<Box<dyn StagingSession>, StorageError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::connection_error(format!("Failed to acquire connection: {e}")))?;
        debug!("Staging connection checked out");
        Ok(Box::new(PostgresSession {
            conn,
            checkpoint_ready: false,
        }))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// One pooled connection, returned to the pool when the session is dropped.
#[derive(Debug)]
pub struct PostgresSession {
    conn: PoolConnection<Postgres>,
    checkpoint_ready: bool,
}

impl PostgresSession {
    async fn ensure_checkpoint_table(&mut self) -> Result<(), StorageError> {
        if !self.checkpoint_ready {
            checkpoint::ensure_table(&mut self.conn).await?;
            self.checkpoint_ready = true;
        }
        Ok(())
    }
}

impl Drop for PostgresSession {
    fn drop(&mut self) {
        debug!("Staging connection released");
    }
}

#[async_trait]
impl StagingSession for PostgresSession {
    async fn upsert_patients(&mut self, records: &[PatientRecord]) -> Result<u64, StorageError> {
        Ok(writer::upsert(&mut self.conn, &PATIENT_TABLE, records).await?)
    }

    async fn insert_observations(
        &mut self,
        records: &[ObservationRecord],
    ) -> Result<u64, StorageError> {
        Ok(writer::insert(&mut self.conn, &OBSERVATION_TABLE, records).await?)
    }

    async fn load_checkpoint(
        &mut self,
        kind: ResourceKind,
    ) -> Result<Option<Checkpoint>, StorageError> {
        self.ensure_checkpoint_table().await?;
        Ok(checkpoint::load(&mut self.conn, kind).await?)
    }

    async fn save_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        self.ensure_checkpoint_table().await?;
        Ok(checkpoint::save(&mut self.conn, checkpoint).await?)
    }

    async fn clear_checkpoint(&mut self, kind: ResourceKind) -> Result<(), StorageError> {
        self.ensure_checkpoint_table().await?;
        Ok(checkpoint::clear(&mut self.conn, kind).await?)
    }
}
