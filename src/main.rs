//! Listing-Harvest main entry point
//!
//! This is the command-line interface for scraping one product listing.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use listing_harvest::config::{load_config_with_hash, Config};
use listing_harvest::engine::{HttpFetcher, Orchestrator};
use listing_harvest::output::{
    default_base_name, export_outcome, print_summary, DatabaseTarget, ExportPlan, OutputFormat,
    SinkReport,
};
use listing_harvest::{AdapterRegistry, ScrapeError, ScrapeOutcome, SessionStatus};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Exit status for a session cancelled with Ctrl-C
const EXIT_CANCELLED: u8 = 130;

/// Listing-Harvest: product listing scraper
///
/// Follows the pagination of one e-commerce listing URL, extracts every
/// product on the way and exports the records to CSV, JSON and SQLite.
#[derive(Parser, Debug)]
#[command(name = "scrape")]
#[command(version)]
#[command(about = "Scrape product listings from e-commerce sites", long_about = None)]
struct Cli {
    /// Listing URL to scrape (a search or category page)
    #[arg(value_name = "URL", required_unless_present = "list_sources")]
    url: Option<String>,

    /// Export formats (overrides output.formats)
    #[arg(short, long, value_enum, num_args = 1..)]
    format: Vec<FormatArg>,

    /// Output file name without extension (default: <source>_<timestamp>)
    #[arg(short, long, value_name = "NAME")]
    output: Option<String>,

    /// Also store the records in the SQLite database
    #[arg(long, conflicts_with = "no_database")]
    database: bool,

    /// Do not store the records in the SQLite database
    #[arg(long)]
    no_database: bool,

    /// Stop after this many listing pages
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// List supported sources and exit
    #[arg(short, long)]
    list_sources: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<ScrapeError>() {
                Some(scrape) => tracing::error!(kind = %scrape.kind(), "{:#}", e),
                None => tracing::error!("{:#}", e),
            }
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber
///
/// `RUST_LOG` takes precedence over the verbosity flag.
fn setup_logging(verbose: bool) {
    let default_filter = if verbose {
        "listing_harvest=debug,info"
    } else {
        "listing_harvest=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let (config, config_hash) = load_config(cli.config.as_deref())?;

    if cli.list_sources {
        list_sources(&AdapterRegistry::from_config(&config.sources));
        return Ok(ExitCode::SUCCESS);
    }

    let url = cli
        .url
        .clone()
        .context("a listing URL is required unless --list-sources is given")?;

    let max_pages = cli.max_pages.or(config.scraper.max_pages);
    let orchestrator: Orchestrator<HttpFetcher> = Orchestrator::from_config(&config, max_pages)?;

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let outcome = orchestrator.run(&url, &cancel).await?;

    let plan = export_plan(&cli, &config, config_hash, &outcome);
    let reports = export_outcome(&plan, &outcome);

    print_summary(&outcome, &reports);

    Ok(exit_code(&outcome, &reports))
}

/// Loads the config file, or the defaults (hashed as "default") without one
fn load_config(path: Option<&Path>) -> listing_harvest::Result<(Config, String)> {
    let Some(path) = path else {
        return Ok((Config::default(), "default".to_string()));
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok((config, hash))
}

/// Cancels the session on the first Ctrl-C
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            cancel.cancel();
        }
    });
}

fn list_sources(registry: &AdapterRegistry) {
    println!("Supported sources:\n");
    for source in registry.supported_sources() {
        println!(
            "  {:<10} {:<10} {}",
            source.id,
            source.display_name,
            source.host_patterns.join(", ")
        );
    }
}

fn export_plan(
    cli: &Cli,
    config: &Config,
    config_hash: String,
    outcome: &ScrapeOutcome,
) -> ExportPlan {
    let formats: Vec<OutputFormat> = if cli.format.is_empty() {
        config
            .output
            .formats
            .iter()
            .filter_map(|f| f.parse().ok())
            .collect()
    } else {
        cli.format.iter().copied().map(OutputFormat::from).collect()
    };

    let database_enabled = if cli.database {
        true
    } else if cli.no_database {
        false
    } else {
        config.output.database_enabled
    };

    ExportPlan {
        directory: PathBuf::from(&config.output.directory),
        base_name: cli
            .output
            .clone()
            .unwrap_or_else(|| default_base_name(&outcome.source_id, Utc::now())),
        formats,
        database: database_enabled.then(|| DatabaseTarget {
            path: PathBuf::from(&config.output.database_path),
            config_hash,
        }),
    }
}

/// Maps the session status onto the process exit code
///
/// A failed session that still recovered records exits 0 with a warning.
/// So does a session where only some sinks failed; losing every sink is an
/// error.
fn exit_code(outcome: &ScrapeOutcome, reports: &[SinkReport]) -> ExitCode {
    if !reports.is_empty() && reports.iter().all(|r| !r.is_ok()) && !outcome.records.is_empty() {
        tracing::error!("No sink accepted the {} records", outcome.records.len());
        return ExitCode::FAILURE;
    }
    if reports.iter().any(|r| !r.is_ok()) {
        tracing::warn!("Some outputs could not be written");
    }

    match outcome.status {
        SessionStatus::CompletedNormal | SessionStatus::CompletedPageLimit => ExitCode::SUCCESS,
        SessionStatus::Cancelled => ExitCode::from(EXIT_CANCELLED),
        SessionStatus::Failed | SessionStatus::Running if outcome.is_partial() => {
            tracing::warn!(
                "Session failed after recovering {} records",
                outcome.records.len()
            );
            ExitCode::SUCCESS
        }
        SessionStatus::Failed | SessionStatus::Running => ExitCode::FAILURE,
    }
}
