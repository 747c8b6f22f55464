use fhirstage_core::ResourceKind;
use serde::Serialize;

/// Counters of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub kind: ResourceKind,
    /// Pages written by this run.
    pub pages: u64,
    /// Raw entries received.
    pub fetched: u64,
    /// Rows reported by the store across all writes.
    pub written: u64,
    /// Patients missing a required field.
    pub dropped: u64,
    /// Records skipped under [`RecordPolicy::DropAndCount`](crate::RecordPolicy).
    pub malformed: u64,
    /// Records collapsed into a later record with the same key on the same page.
    pub duplicates: u64,
    /// Rows reported by the final write.
    pub last_write: Option<u64>,
    /// Pages completed by an earlier run this one resumed from.
    pub resumed_after: Option<u64>,
}

impl IngestReport {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            pages: 0,
            fetched: 0,
            written: 0,
            dropped: 0,
            malformed: 0,
            duplicates: 0,
            last_write: None,
            resumed_after: None,
        }
    }

    /// Pages completed including those of a resumed run.
    pub fn total_pages(&self) -> u64 {
        self.resumed_after.unwrap_or(0) + self.pages
    }
}
