//! Sequential page loop: fetch, normalize, dedupe, write, advance.

use std::future::Future;

use fhirstage_client::PageSource;
use fhirstage_core::{
    CoreError, Page, PatientRecord, ResourceKind, dedupe, normalize_observation,
    normalize_patient,
};
use fhirstage_storage::{Checkpoint, DynStagingStore, StagingSession, StorageError};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestError, Stage, StageError};
use crate::options::{IngestOptions, RecordPolicy};
use crate::progress::Progress;
use crate::report::IngestReport;

/// Ingests every page of one resource kind into a staging store.
///
/// Pages are handled strictly one at a time: the write of page N completes
/// before page N+1 is requested. The store session opened at the start of a
/// run is released on every exit path, including cancellation of the future.
pub struct IngestPipeline<S> {
    source: S,
    store: DynStagingStore,
    options: IngestOptions,
    progress: watch::Sender<Progress>,
}

impl<S: PageSource> IngestPipeline<S> {
    pub fn new(source: S, store: DynStagingStore, options: IngestOptions) -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            source,
            store,
            options,
            progress,
        }
    }

    /// Subscribes to the stage and page count of the current run.
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    #[instrument(skip(self), fields(kind = %kind, backend = self.store.backend_name()))]
    pub async fn run(&self, kind: ResourceKind) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::new(kind);
        self.progress.send_replace(Progress::new(Stage::Write, 0));

        let mut session = self
            .store
            .open_session()
            .await
            .map_err(|e| IngestError::new(Stage::Write, 0, e))?;

        self.drive(kind, session.as_mut(), &mut report).await?;

        info!(
            pages = report.pages,
            fetched = report.fetched,
            written = report.written,
            dropped = report.dropped,
            malformed = report.malformed,
            "Ingestion complete"
        );
        Ok(report)
    }

    async fn drive(
        &self,
        kind: ResourceKind,
        session: &mut dyn StagingSession,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        let resume = self.resume_point(kind, session, report).await?;
        self.enter(Stage::Fetch);
        let first = match resume {
            Some(url) => self.source.next_page(&url).await,
            None => self.source.first_page(kind, self.options.page_size).await,
        };
        let mut page = first.map_err(|e| IngestError::new(Stage::Fetch, 0, e))?;

        loop {
            let written = self.process(kind, &page, session, report).await?;
            report.pages += 1;
            report.written += written;
            report.last_write = Some(written);
            self.progress.send_modify(|p| p.pages_completed = report.pages);
            info!(page = report.total_pages(), entries = page.len(), written, "Page written");

            let Some(next) = page.next_url().map(str::to_owned) else {
                break;
            };

            if self.options.checkpoint {
                self.enter(Stage::Checkpoint);
                let checkpoint = Checkpoint::new(kind, next.as_str(), report.total_pages());
                session
                    .save_checkpoint(&checkpoint)
                    .await
                    .map_err(|e| IngestError::new(Stage::Checkpoint, report.pages, e))?;
            }

            if let Some(max_pages) = self.options.max_pages
                && report.pages >= max_pages
            {
                return Err(IngestError::new(
                    Stage::Fetch,
                    report.pages,
                    StageError::PageLimit { max_pages },
                ));
            }

            self.enter(Stage::Fetch);
            page = self
                .source
                .next_page(&next)
                .await
                .map_err(|e| IngestError::new(Stage::Fetch, report.pages, e))?;
        }

        if self.options.checkpoint {
            self.enter(Stage::Checkpoint);
            session
                .clear_checkpoint(kind)
                .await
                .map_err(|e| IngestError::new(Stage::Checkpoint, report.pages, e))?;
        }
        Ok(())
    }

    async fn resume_point(
        &self,
        kind: ResourceKind,
        session: &mut dyn StagingSession,
        report: &mut IngestReport,
    ) -> Result<Option<String>, IngestError> {
        if !self.options.resume {
            return Ok(None);
        }
        self.enter(Stage::Checkpoint);

        let checkpoint = session
            .load_checkpoint(kind)
            .await
            .map_err(|e| IngestError::new(Stage::Checkpoint, 0, e))?;

        match checkpoint {
            Some(checkpoint) => {
                info!(
                    pages_completed = checkpoint.pages_completed,
                    url = %checkpoint.next_url,
                    "Resuming from checkpoint"
                );
                report.resumed_after = Some(checkpoint.pages_completed);
                Ok(Some(checkpoint.next_url))
            }
            None => {
                info!("No checkpoint found, starting from the first page");
                Ok(None)
            }
        }
    }

    /// Normalizes, dedupes and writes one page. Returns the rows written.
    async fn process(
        &self,
        kind: ResourceKind,
        page: &Page,
        session: &mut dyn StagingSession,
        report: &mut IngestReport,
    ) -> Result<u64, IngestError> {
        report.fetched += page.len() as u64;
        self.enter(Stage::Normalize);

        match kind {
            ResourceKind::Patient => {
                let mut records = Vec::with_capacity(page.len());
                for raw in &page.entries {
                    match normalize_patient(raw) {
                        Ok(Some(record)) => records.push(record),
                        Ok(None) => report.dropped += 1,
                        Err(e) => self.reject(e, report)?,
                    }
                }
                let records = self.collapse(records, PatientRecord::key, report);
                self.enter(Stage::Write);
                self.write(session.upsert_patients(&records), report).await
            }
            ResourceKind::Observation => {
                let mut records = Vec::with_capacity(page.len());
                for raw in &page.entries {
                    match normalize_observation(raw) {
                        Ok(record) => records.push(record),
                        Err(e) => self.reject(e, report)?,
                    }
                }
                let key = self.options.observation_key;
                let records = self.collapse(records, |r| r.key(key), report);
                self.enter(Stage::Write);
                self.write(session.insert_observations(&records), report)
                    .await
            }
        }
    }

    fn collapse<T, K, F>(&self, records: Vec<T>, key_fn: F, report: &mut IngestReport) -> Vec<T>
    where
        K: Eq + std::hash::Hash,
        F: Fn(&T) -> K,
    {
        let before = records.len();
        let records = dedupe(records, key_fn);
        let collapsed = (before - records.len()) as u64;
        if collapsed > 0 {
            debug!(collapsed, "Collapsed duplicate records");
        }
        report.duplicates += collapsed;
        records
    }

    fn reject(&self, err: CoreError, report: &mut IngestReport) -> Result<(), IngestError> {
        if !err.is_record_error() {
            return Err(IngestError::new(Stage::Normalize, report.pages, err));
        }
        match self.options.record_policy {
            RecordPolicy::DropAndCount => {
                warn!(error = %err, category = %err.category(), "Skipping malformed record");
                report.malformed += 1;
                Ok(())
            }
            RecordPolicy::FailFast => Err(IngestError::new(Stage::Normalize, report.pages, err)),
        }
    }

    async fn write<F>(&self, write: F, report: &IngestReport) -> Result<u64, IngestError>
    where
        F: Future<Output = Result<u64, StorageError>>,
    {
        let result = match self.options.write_timeout {
            Some(limit) => match tokio::time::timeout(limit, write).await {
                Ok(result) => result,
                Err(_) => Err(StorageError::timeout(
                    "page write",
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                )),
            },
            None => write.await,
        };
        result.map_err(|e| {
            warn!(category = %e.category(), error = %e, "Page write failed");
            IngestError::new(Stage::Write, report.pages, e)
        })
    }

    fn enter(&self, stage: Stage) {
        self.progress.send_modify(|p| p.stage = stage);
    }
}
