//! Strongbox catalogue builder entry point
//!
//! This is the command-line interface for scraping addon hosts and writing
//! Strongbox addon catalogues.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use strongbox_catalogue_builder::config::{load_config_with_hash, validate, Config};
use strongbox_catalogue_builder::{commands, CancelSignal, Source};
use tracing_subscriber::EnvFilter;

/// Builds Strongbox addon catalogues
///
/// Crawls WowInterface and the GitHub addon catalogue, merges everything
/// known about each addon and writes validated catalogue files.
#[derive(Parser, Debug)]
#[command(name = "strongbox-catalogue-builder")]
#[command(version)]
#[command(about = "Builds Strongbox addon catalogues", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply without one)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the sources and write fresh catalogues
    Scrape {
        /// Only crawl this source (repeatable): wowinterface, github
        #[arg(long = "source", value_name = "SOURCE")]
        sources: Vec<Source>,

        /// Number of crawl workers
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Rebuild a catalogue from the last completed scrape, without the network
    Write {
        /// Only include this source (repeatable)
        #[arg(long = "source", value_name = "SOURCE")]
        sources: Vec<Source>,

        /// Write to this file instead of stdout (repeatable)
        #[arg(long = "out", value_name = "FILE")]
        outputs: Vec<PathBuf>,
    },

    /// Validate a catalogue file
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Scrape { sources, workers } => {
            handle_scrape(cli.config.as_deref(), &sources, workers).await
        }
        Command::Write { sources, outputs } => {
            handle_write(cli.config.as_deref(), &sources, &outputs)
        }
        Command::Validate { file } => commands::validate(&file)
            .with_context(|| format!("{} is not a valid catalogue", file.display())),
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("strongbox_catalogue_builder=info,warn"),
                1 => EnvFilter::new("strongbox_catalogue_builder=debug,info"),
                2 => EnvFilter::new("strongbox_catalogue_builder=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: Option<&Path>) -> anyhow::Result<(Config, String)> {
    match path {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::debug!("No configuration file given, using defaults"),
    }
    let (config, hash) = load_config_with_hash(path).context("failed to load configuration")?;
    tracing::debug!(hash = %hash, "Configuration loaded");
    Ok((config, hash))
}

async fn handle_scrape(
    config_path: Option<&Path>,
    sources: &[Source],
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let (mut config, hash) = load(config_path)?;
    if let Some(workers) = workers {
        config.crawler.workers = workers;
        validate(&config).context("invalid --workers")?;
    }

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            on_interrupt.cancel();
        }
    });

    let summary = commands::scrape(&config, &hash, sources, cancel)
        .await
        .context("scrape failed")?;

    for file in &summary.files {
        tracing::info!("Wrote {}", file.display());
    }
    tracing::info!(
        "Run {}: {} addons from {} URLs ({} failed, {} not usable, {} unparseable)",
        summary.run_id,
        summary.addons,
        summary.stats.urls_claimed,
        summary.stats.urls_failed,
        summary.stats.urls_rejected,
        summary.stats.parse_failures
    );
    Ok(())
}

fn handle_write(
    config_path: Option<&Path>,
    sources: &[Source],
    outputs: &[PathBuf],
) -> anyhow::Result<()> {
    let (config, _hash) = load(config_path)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let catalogue =
        commands::write(&config, sources, outputs, &mut handle).context("write failed")?;
    tracing::info!("Catalogue rebuilt with {} addons", catalogue.total);
    Ok(())
}
