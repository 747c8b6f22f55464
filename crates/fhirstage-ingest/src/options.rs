use std::time::Duration;

use fhirstage_client::DEFAULT_PAGE_SIZE;
use fhirstage_core::ObservationKey;
use serde::{Deserialize, Serialize};

/// What to do with a record that cannot be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordPolicy {
    /// Skip the record, count it and log a warning.
    #[default]
    DropAndCount,
    /// Abort the run at the first malformed record.
    FailFast,
}

/// Per-run pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// `_count` of the first search request.
    pub page_size: u32,
    pub record_policy: RecordPolicy,
    pub observation_key: ObservationKey,
    /// Persist the continuation URL after every written page.
    pub checkpoint: bool,
    /// Start from the persisted continuation URL when one exists.
    pub resume: bool,
    /// Deadline for a single page write.
    pub write_timeout: Option<Duration>,
    /// Abort once this many pages were written and another one is linked.
    pub max_pages: Option<u64>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            record_policy: RecordPolicy::default(),
            observation_key: ObservationKey::default(),
            checkpoint: false,
            resume: false,
            write_timeout: None,
            max_pages: None,
        }
    }
}

impl IngestOptions {
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_record_policy(mut self, policy: RecordPolicy) -> Self {
        self.record_policy = policy;
        self
    }

    #[must_use]
    pub fn with_observation_key(mut self, key: ObservationKey) -> Self {
        self.observation_key = key;
        self
    }

    #[must_use]
    pub fn with_checkpoint(mut self, enabled: bool) -> Self {
        self.checkpoint = enabled;
        self
    }

    /// Resuming implies checkpointing.
    #[must_use]
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        if resume {
            self.checkpoint = true;
        }
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = IngestOptions::default();
        assert_eq!(options.page_size, 250);
        assert_eq!(options.record_policy, RecordPolicy::DropAndCount);
        assert_eq!(options.observation_key, ObservationKey::EncounterConcept);
        assert!(!options.checkpoint);
        assert!(options.max_pages.is_none());
    }

    #[test]
    fn test_resume_enables_checkpoint() {
        let options = IngestOptions::default().with_resume(true);
        assert!(options.resume);
        assert!(options.checkpoint);
    }
}
