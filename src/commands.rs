//! Implementations of the `scrape`, `write` and `validate` subcommands
//!
//! Each command takes a loaded [`Config`] so the whole pipeline can be
//! driven from tests as well as from `main`.

use crate::cancel::CancelSignal;
use crate::catalogue::{
    build_catalogue, filter_catalogue, group_by_identity, merge_all, shorten_catalogue, to_json,
    validate_catalogue_file, write_catalogue,
};
use crate::config::Config;
use crate::crawler::{seeds, Coordinator, CrawlStats};
use crate::http::{CachingFetcher, Fetcher, HttpFetcher, RetryPolicy};
use crate::model::{Addon, Catalogue, PartialRecord, Source};
use crate::parser::ParserRegistry;
use crate::storage::{open_storage, Storage};
use crate::{CatalogueError, ConfigError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a successful scrape produced
#[derive(Debug)]
pub struct ScrapeSummary {
    pub run_id: i64,
    pub stats: CrawlStats,
    pub addons: usize,
    pub files: Vec<PathBuf>,
}

/// Sources a command applies to; an empty selection means all of them
fn selected(sources: &[Source]) -> Vec<Source> {
    if sources.is_empty() {
        Source::ALL.to_vec()
    } else {
        sources.to_vec()
    }
}

/// Midnight UTC at the start of the configured short-catalogue cutoff date
pub fn short_cutoff(config: &Config) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(&config.output.short_cutoff, "%Y-%m-%d").map_err(|e| {
        ConfigError::Validation(format!(
            "invalid short-cutoff '{}': {}",
            config.output.short_cutoff, e
        ))
    })?;
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "invalid short-cutoff '{}'",
                config.output.short_cutoff
            ))
            .into()
        })
}

fn build_fetcher(config: &Config) -> Result<Arc<dyn Fetcher>> {
    let http = HttpFetcher::from_config(&config.user_agent)?;

    if !config.cache.enabled {
        tracing::info!("Response cache disabled");
        return Ok(Arc::new(http));
    }

    let cached = CachingFetcher::new(
        http,
        &config.cache.directory,
        config.cache.default_ttl(),
        config.cache.search_ttl(),
    )?;
    tracing::info!(directory = %cached.directory().display(), "Using response cache");
    Ok(Arc::new(cached))
}

/// Writes the per-source, full and short catalogues into the state directory
///
/// Every file is validated after it is written.
pub fn write_catalogues(
    config: &Config,
    addons: Vec<Addon>,
    sources: &[Source],
) -> Result<Vec<PathBuf>> {
    let state_dir = Path::new(&config.output.state_directory);
    let cutoff = short_cutoff(config)?;
    let full = build_catalogue(addons, sources);
    let mut files = Vec::new();

    for source in selected(sources) {
        let path = state_dir.join(format!("{}-catalogue.json", source));
        let catalogue = filter_catalogue(&full, |addon| addon.source == source);
        write_catalogue(&catalogue, &path)?;
        files.push(path);
    }

    let full_path = state_dir.join("full-catalogue.json");
    write_catalogue(&full, &full_path)?;
    files.push(full_path);

    let short_path = state_dir.join("short-catalogue.json");
    write_catalogue(&shorten_catalogue(&full, cutoff), &short_path)?;
    files.push(short_path);

    Ok(files)
}

/// Crawls the selected sources and writes fresh catalogues
///
/// The run is recorded in the state database. A cancelled run is marked
/// interrupted and writes nothing.
pub async fn scrape(
    config: &Config,
    config_hash: &str,
    sources: &[Source],
    cancel: CancelSignal,
) -> Result<ScrapeSummary> {
    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    let fetcher = build_fetcher(config)?;
    let run_id = storage.create_run(config_hash)?;

    let coordinator = Coordinator::new(
        config.crawler.clone(),
        RetryPolicy::from(&config.retry),
        fetcher,
        ParserRegistry::with_defaults(&config.sources),
        cancel,
    );

    let outcome = match coordinator.run(seeds(&config.sources, sources)).await {
        Ok(outcome) => outcome,
        Err(CatalogueError::Cancelled) => {
            storage.mark_interrupted(run_id)?;
            return Err(CatalogueError::Cancelled);
        }
        Err(e) => {
            storage.mark_failed(run_id)?;
            return Err(e);
        }
    };

    let mut flat: Vec<PartialRecord> = outcome.records.values().flatten().cloned().collect();
    flat.sort_by(|a, b| {
        a.identity
            .cmp(&b.identity)
            .then_with(|| a.origin.cmp(&b.origin))
            .then_with(|| a.resource_url.cmp(&b.resource_url))
    });
    storage.save_partial_records(run_id, &flat)?;

    let addons = merge_all(outcome.records);
    let addon_count = addons.len();

    let files = match write_catalogues(config, addons, sources) {
        Ok(files) => files,
        Err(e) => {
            storage.mark_failed(run_id)?;
            return Err(e);
        }
    };
    storage.complete_run(run_id)?;

    tracing::info!(
        run_id,
        addons = addon_count,
        urls = outcome.stats.urls_claimed,
        failed = outcome.stats.urls_failed,
        rejected = outcome.stats.urls_rejected,
        parse_failures = outcome.stats.parse_failures,
        "Scrape finished"
    );

    Ok(ScrapeSummary {
        run_id,
        stats: outcome.stats,
        addons: addon_count,
        files,
    })
}

/// Rebuilds a catalogue from the latest completed run, without the network
///
/// Writes to each path in `outputs`, or to `stdout` when there are none.
pub fn write(
    config: &Config,
    sources: &[Source],
    outputs: &[PathBuf],
    stdout: &mut dyn Write,
) -> Result<Catalogue> {
    let db_path = Path::new(&config.output.database_path);
    if !db_path.exists() {
        return Err(CatalogueError::NoCompletedRun(db_path.display().to_string()));
    }

    let storage = open_storage(db_path)?;
    let run = storage
        .get_latest_completed_run()?
        .ok_or_else(|| CatalogueError::NoCompletedRun(db_path.display().to_string()))?;

    let records = storage.load_partial_records(run.id)?;
    tracing::info!(
        run_id = run.id,
        started_at = %run.started_at,
        records = records.len(),
        "Rebuilding from stored run"
    );

    let addons = merge_all(group_by_identity(records));
    let catalogue = build_catalogue(addons, sources);

    if outputs.is_empty() {
        stdout.write_all(&to_json(&catalogue)?)?;
        stdout.flush()?;
    } else {
        for path in outputs {
            write_catalogue(&catalogue, path)?;
        }
    }

    Ok(catalogue)
}

/// Checks a catalogue file against the catalogue format
pub fn validate(path: &Path) -> Result<()> {
    validate_catalogue_file(path)?;
    tracing::info!(path = %path.display(), "Catalogue is valid");
    Ok(())
}
