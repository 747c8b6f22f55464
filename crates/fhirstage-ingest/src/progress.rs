use crate::error::Stage;

/// Position of a running ingestion, published after every stage change.
///
/// Callers that cancel a run read the last value to report where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    /// Pages fully written so far.
    pub pages_completed: u64,
}

impl Progress {
    pub fn new(stage: Stage, pages_completed: u64) -> Self {
        Self {
            stage,
            pages_completed,
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(Stage::Fetch, 0)
    }
}
