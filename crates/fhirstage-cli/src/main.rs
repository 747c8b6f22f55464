use clap::Parser;
use fhirstage_cli::cli::Cli;
use fhirstage_cli::config::loader::load_config;
use fhirstage_cli::output::{print_error, print_report};
use fhirstage_cli::{app, observability};
use fhirstage_ingest::IngestError;

#[tokio::main]
async fn main() {
    // .env is optional; only report files that exist but cannot be read
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    observability::init_tracing();

    let cli = Cli::parse();

    let cfg = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            print_error(&format!("Configuration error: {e}"));
            std::process::exit(2);
        }
    };
    observability::apply_logging_level(&cfg.logging.level);

    match app::run(&cli, &cfg).await {
        Ok(report) => print_report(&report),
        Err(e) => {
            // IngestError already carries its cause in its message
            let message = match e.downcast_ref::<IngestError>() {
                Some(err) => err.to_string(),
                None => format!("{e:#}"),
            };
            print_error(&message);
            std::process::exit(1);
        }
    }
}
