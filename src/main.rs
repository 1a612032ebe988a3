//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the catalog harvester.

use anyhow::Context;
use catalog_harvest::config::{load_config_with_hash, validate, Config};
use catalog_harvest::crawler::{spawn_run, Harvester};
use catalog_harvest::output::print_summary;
use catalog_harvest::HarvestError;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: an ordered catalog fetcher
///
/// Fetches every page linked from the catalog of an index page, extracts
/// its text and writes everything to a single file in catalog order.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version)]
#[command(about = "Fetch every page of a catalog into one ordered text file", long_about = None)]
struct Cli {
    /// URL of the index page listing the catalog
    #[arg(value_name = "INDEX_URL")]
    index_url: String,

    /// Directory the output file is written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of pages fetched at once (overrides the config file)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Encoding the pages are served in (overrides the config file)
    #[arg(long, value_name = "LABEL")]
    encoding: Option<String>,

    /// List the catalog entries without fetching them
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;
    let harvester = Arc::new(Harvester::new(&config).context("Failed to set up harvester")?);

    if cli.dry_run {
        handle_dry_run(&harvester, &cli.index_url).await
    } else {
        handle_harvest(harvester, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(limit) = cli.concurrency {
        config.pipeline.concurrency_limit = limit;
    }
    if let Some(label) = &cli.encoding {
        config.fetch.source_encoding = label.clone();
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: lists the catalog without fetching it
async fn handle_dry_run(harvester: &Harvester, index_url: &str) -> anyhow::Result<()> {
    let entries = harvester.discover(index_url).await?;

    println!("=== Catalog of {} ===\n", index_url.trim());
    for entry in &entries {
        println!("  {:>4}. {}", entry.position + 1, entry.source_url);
    }
    println!(
        "\n✓ Would fetch {} pages with up to {} at once",
        entries.len(),
        harvester.concurrency_limit()
    );

    Ok(())
}

/// Handles the main harvest: runs in the background, Ctrl-C cancels it
async fn handle_harvest(harvester: Arc<Harvester>, cli: &Cli) -> anyhow::Result<()> {
    let handle = spawn_run(harvester, cli.index_url.clone(), cli.output_dir.clone());

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            canceller.cancel();
        }
    });

    match handle.wait().await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(HarvestError::Cancelled) => {
            tracing::warn!("Run cancelled; output may be missing or incomplete");
            Err(HarvestError::Cancelled.into())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
