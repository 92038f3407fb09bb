//! Fire station harvester CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use harvester::{
    error::{AppError, Result},
    models::{Config, RunSummary},
    pipeline,
    services::HttpFeatureSource,
    storage::{LocalStorage, RecordStorage},
};

/// Harvests fire station records and publishes sitemaps
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Fire station feature service harvester"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Override the dataset output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the sitemap output directory
    #[arg(long)]
    public_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the service, download every record and write the dataset
    Fetch,

    /// Build sitemaps and robots.txt from the stored dataset
    Sitemap,

    /// Run full pipeline: Fetch → Sitemap
    Pipeline,

    /// Validate the configuration file
    Validate,

    /// Show the stored dataset's metadata
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Fatal errors fail the process; anything else is logged and the run
/// still exits successfully.
fn exit_status(error: AppError) -> Result<()> {
    if error.is_fatal() {
        log::error!("Harvest aborted: {}", error);
        return Err(error);
    }
    log::error!("Harvest finished with errors: {}", error);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Harvester starting...");

    let mut config = Config::load_or_default(&cli.config);
    if let Some(dir) = cli.data_dir {
        config.output.data_dir = dir;
    }
    if let Some(dir) = cli.public_dir {
        config.output.public_dir = dir;
    }
    log::info!("Loaded configuration from {}", cli.config.display());

    let storage = LocalStorage::from_config(&config.output);

    match cli.command {
        Command::Fetch => {
            config.validate()?;
            let source = HttpFeatureSource::from_config(&config.http)?;
            match pipeline::run_acquisition(&config, &source, &storage).await {
                Ok(report) => log::info!(
                    "Fetch complete: {} records from {}",
                    report.dataset.records.len(),
                    report.dataset.metadata.endpoint
                ),
                Err(e) => return exit_status(e),
            }
        }

        Command::Sitemap => {
            config.validate()?;
            let report = pipeline::run_sitemap_from_storage(&config, &storage).await?;
            log::info!(
                "Sitemap complete: {} URLs in {} document(s)",
                report.url_count,
                report.documents
            );
        }

        Command::Pipeline => {
            config.validate()?;
            let source = HttpFeatureSource::from_config(&config.http)?;
            if let Err(e) = pipeline::run_pipeline(&config, &source, &storage).await {
                return exit_status(e);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} primary candidate(s) plus mirror)",
                config.source.candidates.len()
            );
        }

        Command::Info => {
            log::info!("Data directory: {}", storage.data_dir().display());
            log::info!("Public directory: {}", storage.public_dir().display());

            match storage.load_dataset().await? {
                Some(dataset) => {
                    let metadata = &dataset.metadata;
                    log::info!("Source: {} ({})", metadata.source, metadata.provider);
                    log::info!("Endpoint: {}", metadata.endpoint);
                    log::info!("Generated at: {}", metadata.generated_at);
                    log::info!(
                        "Records: {} ({} fetched, {} declared)",
                        metadata.record_count,
                        metadata.fetched_count,
                        metadata.declared_count
                    );
                    if let Some(reason) = &metadata.truncated {
                        log::warn!("Incomplete download: {}", reason);
                    }

                    let summary = RunSummary::from_records(&dataset.records);
                    for state in summary.states.iter().take(10) {
                        log::info!("    {}: {}", state.state, state.count);
                    }
                }
                None => log::info!("No dataset found yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
