//! In-memory staging store.
//!
//! Mirrors the write semantics of the PostgreSQL backend: patients are
//! upserted by `case_id`, observations are appended, and a patient batch that
//! repeats a `case_id` is rejected the way `ON CONFLICT DO UPDATE` rejects it.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use fhirstage_core::{ObservationRecord, PatientRecord, ResourceKind};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::traits::{StagingSession, StagingStore};
use crate::types::Checkpoint;

#[derive(Debug, Default)]
struct MemoryState {
    patients: DashMap<String, PatientRecord>,
    observations: RwLock<Vec<ObservationRecord>>,
    checkpoints: DashMap<ResourceKind, Checkpoint>,
    open_sessions: AtomicUsize,
    sessions_opened: AtomicU64,
    statements: AtomicU64,
}

/// In-memory staging store, shareable across clones.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStagingStore {
    state: Arc<MemoryState>,
}

impl InMemoryStagingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the staged patient row for `case_id`.
    pub fn patient(&self, case_id: &str) -> Option<PatientRecord> {
        self.state.patients.get(case_id).map(|r| r.value().clone())
    }

    /// Number of rows in the patient table.
    pub fn patient_count(&self) -> usize {
        self.state.patients.len()
    }

    /// All patient rows, ordered by `case_id`.
    pub fn patients(&self) -> Vec<PatientRecord> {
        let mut rows: Vec<PatientRecord> = self
            .state
            .patients
            .iter()
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| a.case_id.cmp(&b.case_id));
        rows
    }

    /// All observation rows in insertion order.
    pub async fn observations(&self) -> Vec<ObservationRecord> {
        self.state.observations.read().await.clone()
    }

    /// Number of rows in the observation table.
    pub async fn observation_count(&self) -> usize {
        self.state.observations.read().await.len()
    }

    /// Current checkpoint for `kind`.
    pub fn checkpoint(&self, kind: ResourceKind) -> Option<Checkpoint> {
        self.state.checkpoints.get(&kind).map(|c| c.value().clone())
    }

    /// Sessions currently checked out.
    pub fn open_sessions(&self) -> usize {
        self.state.open_sessions.load(Ordering::SeqCst)
    }

    /// Sessions checked out over the lifetime of the store.
    pub fn sessions_opened(&self) -> u64 {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    /// Write statements executed; empty batches do not count.
    pub fn statements(&self) -> u64 {
        self.state.statements.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StagingStore for InMemoryStagingStore {
    async fn open_session(&self) -> Result<Box<dyn StagingSession>, StorageError> {
        self.state.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession {
            state: Arc::clone(&self.state),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Session over the shared in-memory state.
#[derive(Debug)]
pub struct InMemorySession {
    state: Arc<MemoryState>,
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.state.open_sessions.fetch_sub(1, Ordering::SeqCst);
        debug!("In-memory staging session released");
    }
}

#[async_trait]
impl StagingSession for InMemorySession {
    async fn upsert_patients(&mut self, records: &[PatientRecord]) -> Result<u64, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut seen = HashSet::with_capacity(records.len());
        if let Some(dup) = records.iter().find(|r| !seen.insert(r.case_id.as_str())) {
            return Err(StorageError::write(
                ResourceKind::Patient.table(),
                format!("batch affects case_id {} more than once", dup.case_id),
            ));
        }

        for record in records {
            self.state
                .patients
                .insert(record.case_id.clone(), record.clone());
        }
        self.state.statements.fetch_add(1, Ordering::SeqCst);
        Ok(records.len() as u64)
    }

    async fn insert_observations(
        &mut self,
        records: &[ObservationRecord],
    ) -> Result<u64, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }

        self.state
            .observations
            .write()
            .await
            .extend(records.iter().cloned());
        self.state.statements.fetch_add(1, Ordering::SeqCst);
        Ok(records.len() as u64)
    }

    async fn load_checkpoint(
        &mut self,
        kind: ResourceKind,
    ) -> Result<Option<Checkpoint>, StorageError> {
        Ok(self.state.checkpoints.get(&kind).map(|c| c.value().clone()))
    }

    async fn save_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        self.state
            .checkpoints
            .insert(checkpoint.kind, checkpoint.clone());
        Ok(())
    }

    async fn clear_checkpoint(&mut self, kind: ResourceKind) -> Result<(), StorageError> {
        self.state.checkpoints.remove(&kind);
        Ok(())
    }
}
