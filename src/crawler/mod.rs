//! Crawl orchestration
//!
//! This module contains the concurrent crawl itself:
//! - Seeding the frontier with one entry point set per source
//! - A fixed pool of workers fetching and parsing URLs
//! - Completion detection and cancellation

mod coordinator;

pub use crate::state::{CrawlStats, FrontierEntry};
pub use coordinator::{Coordinator, CrawlOutcome};

use crate::config::SourcesConfig;
use crate::model::Source;

/// Entry points for each requested source; an empty slice means every source
pub fn seeds(config: &SourcesConfig, sources: &[Source]) -> Vec<FrontierEntry> {
    let wanted = |source: Source| sources.is_empty() || sources.contains(&source);
    let mut entries = Vec::new();

    if wanted(Source::Wowinterface) {
        entries.push(FrontierEntry::new(
            Source::Wowinterface,
            config.wowinterface.filelist_url(),
        ));
        entries.extend(
            config
                .wowinterface
                .index_urls()
                .into_iter()
                .map(|url| FrontierEntry::new(Source::Wowinterface, url)),
        );
    }

    if wanted(Source::Github) {
        entries.push(FrontierEntry::new(
            Source::Github,
            config.github.catalogue_url.clone(),
        ));
    }

    entries
}
