use std::sync::Arc;

use anyhow::{Context, Result};
use fhirstage_client::FhirClient;
use fhirstage_db_postgres::{PostgresStagingStore, mask_password};
use fhirstage_ingest::{IngestError, IngestPipeline, IngestReport};
use fhirstage_storage::{DynStagingStore, InMemoryStagingStore};
use tracing::{info, warn};

use crate::cli::Cli;
use crate::config::AppConfig;

/// Runs one ingestion as described by the command line and configuration.
///
/// Ctrl-C abandons the page in flight and fails with the stage and page
/// count reached so far.
pub async fn run(cli: &Cli, cfg: &AppConfig) -> Result<IngestReport> {
    let client = FhirClient::new(
        &cfg.upstream.base_url,
        cfg.upstream.auth(),
        cfg.upstream.request_timeout(),
    )
    .context("Failed to create FHIR client")?;

    let mut options = cfg.ingest.to_options().with_resume(cli.resume);
    if let Some(page_size) = cli.page_size {
        options = options.with_page_size(page_size);
    }

    let store: DynStagingStore = if cli.dry_run {
        info!("Dry run, records go to an in-memory store");
        Arc::new(InMemoryStagingStore::new())
    } else {
        let pg = cfg.postgres.to_postgres_config();
        let url = mask_password(&pg.url);
        let store = PostgresStagingStore::new(pg)
            .await
            .with_context(|| format!("Failed to connect to PostgreSQL at {url}"))?;
        Arc::new(store)
    };

    info!(
        kind = %cli.kind,
        upstream = %client.base_url(),
        page_size = options.page_size,
        resume = options.resume,
        "Starting ingestion"
    );

    let pipeline = IngestPipeline::new(client, store, options);
    let progress = pipeline.progress();

    let report = tokio::select! {
        result = pipeline.run(cli.kind) => result?,
        _ = tokio::signal::ctrl_c() => {
            let at = *progress.borrow();
            warn!(
                stage = %at.stage,
                pages_completed = at.pages_completed,
                "Interrupted, abandoning the current page"
            );
            return Err(IngestError::interrupted(at).into());
        }
    };
    Ok(report)
}
