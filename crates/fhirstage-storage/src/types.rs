//! Shared storage types.

use fhirstage_core::ResourceKind;
use serde::{Deserialize, Serialize};

/// Pagination position persisted after each written page.
///
/// `next_url` is the continuation link of the last fully written page, so a
/// resumed run starts with the first page that was not yet written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub kind: ResourceKind,
    pub next_url: String,
    pub pages_completed: u64,
}

impl Checkpoint {
    pub fn new(kind: ResourceKind, next_url: impl Into<String>, pages_completed: u64) -> Self {
        Self {
            kind,
            next_url: next_url.into(),
            pages_completed,
        }
    }
}
