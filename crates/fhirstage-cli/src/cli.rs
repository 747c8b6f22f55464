use clap::Parser;
use fhirstage_core::{CoreError, ResourceKind};

use crate::config::MAX_PAGE_SIZE;

#[derive(Debug, Parser)]
#[command(name = "fhirstage")]
#[command(about = "Stage FHIR Patient and Observation resources into PostgreSQL")]
#[command(version)]
pub struct Cli {
    /// Resource kind to ingest: patients, observations (alias: obs)
    #[arg(value_parser = parse_kind)]
    pub kind: ResourceKind,

    /// `_count` of the first search request (overrides ingest.page_size)
    #[arg(value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PAGE_SIZE)))]
    pub page_size: Option<u32>,

    /// Configuration file (default: fhirstage.toml in the working directory)
    #[arg(short, long, env = "FHIRSTAGE_CONFIG")]
    pub config: Option<String>,

    /// Continue from the checkpoint of an interrupted run
    #[arg(long)]
    pub resume: bool,

    /// Write into an in-memory store instead of PostgreSQL
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_kind(selector: &str) -> Result<ResourceKind, String> {
    selector.parse().map_err(|e: CoreError| {
        let valid: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.selector()).collect();
        format!("{e}; expected one of: {}, obs", valid.join(", "))
    })
}
