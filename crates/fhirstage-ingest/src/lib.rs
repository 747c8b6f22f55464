//! # fhirstage-ingest
//!
//! Drives one resource kind from the first search page to the last:
//!
//! 1. open a store session
//! 2. fetch the first page, or the checkpointed continuation URL on resume
//! 3. normalize every entry, dedupe the page, write it in one batch
//! 4. persist the next URL when checkpointing, follow it, repeat
//! 5. clear the checkpoint and release the session
//!
//! ```ignore
//! use std::sync::Arc;
//! use fhirstage_ingest::{IngestOptions, IngestPipeline};
//!
//! let pipeline = IngestPipeline::new(client, Arc::new(store), IngestOptions::default());
//! let report = pipeline.run(ResourceKind::Patient).await?;
//! println!("{} rows over {} pages", report.written, report.pages);
//! ```

mod error;
mod options;
mod pipeline;
mod progress;
mod report;

pub use error::{IngestError, Stage, StageError};
pub use options::{IngestOptions, RecordPolicy};
pub use pipeline::IngestPipeline;
pub use progress::Progress;
pub use report::IngestReport;
