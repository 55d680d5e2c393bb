//! ERA5-Land importer service.

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use dhis2_client::Dhis2Client;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use era5_importer::config::{Args, Command, ImporterConfig, LogFormat};
use era5_importer::metrics;
use era5_importer::pipeline::{run_import, RunOutcome};
use era5_importer::scheduler::run_forever;
use era5_importer::source::CdsSource;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Importer failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", args.log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match args.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn run(args: Args) -> Result<()> {
    let config = ImporterConfig::from_args(&args).context("Invalid configuration")?;
    info!(?config, "Starting ERA5-Land importer");

    let dhis2 = Dhis2Client::new(config.dhis2.clone()).context("Failed to create DHIS2 client")?;
    let source = CdsSource::new(&config)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            run_once(&config, &dhis2, &source).await?;
        }
        Command::Schedule { run_on_start } => {
            if let Some(port) = args.metrics_port {
                metrics::install_exporter(port)?;
            }

            let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Received shutdown signal");
                shutdown_tx.send(()).ok();
            });

            run_forever(&config.cron, run_on_start, shutdown_rx, || {
                run_once(&config, &dhis2, &source)
            })
            .await?;
        }
    }

    info!("Importer finished");
    Ok(())
}

async fn run_once(config: &ImporterConfig, dhis2: &Dhis2Client, source: &CdsSource) -> Result<()> {
    let today = Utc::now().date_naive();
    match run_import(config, today, dhis2, source).await {
        Ok(outcome) => {
            metrics::record_outcome(&outcome);
            if let RunOutcome::Imported { summary } = &outcome {
                info!(status = %summary.status, counts = %summary.import_count, "Run complete");
            }
            Ok(())
        }
        Err(e) => {
            metrics::record_failure();
            Err(e)
        }
    }
}
