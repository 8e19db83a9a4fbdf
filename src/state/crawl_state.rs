//! Shared crawl state
//!
//! The seen set, the frontier queue, the outstanding counter and the record
//! accumulator live in one struct behind one lock, so every update to them
//! is atomic with respect to the others.
//!
//! `outstanding` counts URLs that are claimed but not completed. It goes up
//! when a URL is claimed and down only in [`CrawlState::complete`], after the
//! URL's own discoveries have been claimed. Zero therefore means the queue
//! is empty and no worker holds a URL.

use crate::model::{Identity, PartialRecord, Source};
use crate::state::UrlState;
use std::collections::{HashMap, VecDeque};

/// A URL waiting to be fetched, tagged with the source whose parser reads it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrontierEntry {
    pub source: Source,
    pub url: String,
}

impl FrontierEntry {
    pub fn new(source: Source, url: impl Into<String>) -> Self {
        Self {
            source,
            url: url.into(),
        }
    }
}

/// Counters reported at the end of a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub urls_claimed: usize,
    pub duplicates_ignored: usize,
    pub urls_processed: usize,
    pub urls_rejected: usize,
    pub urls_failed: usize,
    pub parse_failures: usize,
    pub records_accumulated: usize,
    pub identities: usize,
}

#[derive(Debug, Default)]
pub struct CrawlState {
    urls: HashMap<String, UrlState>,
    queue: VecDeque<FrontierEntry>,
    outstanding: usize,
    in_flight: usize,
    records: HashMap<Identity, Vec<PartialRecord>>,
    closed: bool,
    stats: CrawlStats,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a URL seen and enqueues it; false if it was already seen
    pub fn claim(&mut self, entry: FrontierEntry) -> bool {
        if self.closed || self.urls.contains_key(&entry.url) {
            self.stats.duplicates_ignored += 1;
            return false;
        }

        self.urls.insert(entry.url.clone(), UrlState::InFrontier);
        self.queue.push_back(entry);
        self.outstanding += 1;
        self.stats.urls_claimed += 1;
        true
    }

    /// Takes the next URL off the frontier and marks it fetching
    pub fn next(&mut self) -> Option<FrontierEntry> {
        let entry = self.queue.pop_front()?;
        self.urls.insert(entry.url.clone(), UrlState::Fetching);
        self.in_flight += 1;
        Some(entry)
    }

    /// Records the result of one URL
    ///
    /// Discovered URLs are claimed and records accumulated before the URL
    /// stops counting as outstanding.
    pub fn complete(
        &mut self,
        url: &str,
        state: UrlState,
        records: Vec<PartialRecord>,
        discovered: Vec<FrontierEntry>,
    ) {
        for entry in discovered {
            self.claim(entry);
        }

        self.stats.records_accumulated += records.len();
        for record in records {
            self.records
                .entry(record.identity.clone())
                .or_default()
                .push(record);
        }

        match state {
            UrlState::Processed => self.stats.urls_processed += 1,
            UrlState::Rejected => self.stats.urls_rejected += 1,
            UrlState::Failed => self.stats.urls_failed += 1,
            UrlState::ParseFailed => self.stats.parse_failures += 1,
            UrlState::InFrontier | UrlState::Fetching => {
                tracing::warn!(url = %url, state = %state, "Completed with a non-terminal state");
            }
        }

        if let Some(current) = self.urls.get_mut(url) {
            if current.can_transition_to(state) {
                *current = state;
            }
        }

        self.in_flight = self.in_flight.saturating_sub(1);
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    /// Number of URLs waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of URLs a worker currently holds
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// True when nothing is queued and nothing is being fetched
    pub fn is_drained(&self) -> bool {
        self.outstanding == 0
    }

    /// Stops the frontier; workers exit once they see it
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn url_state(&self, url: &str) -> Option<UrlState> {
        self.urls.get(url).copied()
    }

    pub fn stats(&self) -> CrawlStats {
        CrawlStats {
            identities: self.records.len(),
            ..self.stats.clone()
        }
    }

    /// Hands over the accumulated records, leaving the state empty
    pub fn take_records(&mut self) -> HashMap<Identity, Vec<PartialRecord>> {
        std::mem::take(&mut self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OriginKind;

    fn entry(url: &str) -> FrontierEntry {
        FrontierEntry::new(Source::Wowinterface, url)
    }

    fn record(id: &str, url: &str) -> PartialRecord {
        PartialRecord::new(Source::Wowinterface, id, OriginKind::Listing, url)
    }

    #[test]
    fn test_claim_deduplicates() {
        let mut state = CrawlState::new();
        assert!(state.claim(entry("https://a/1")));
        assert!(!state.claim(entry("https://a/1")));
        assert_eq!(state.pending(), 1);
        assert_eq!(state.stats().duplicates_ignored, 1);
    }

    #[test]
    fn test_completed_url_is_not_reclaimed() {
        let mut state = CrawlState::new();
        state.claim(entry("https://a/1"));
        let next = state.next().unwrap();
        state.complete(&next.url, UrlState::Processed, vec![], vec![]);

        assert!(!state.claim(entry("https://a/1")));
        assert_eq!(state.url_state("https://a/1"), Some(UrlState::Processed));
        assert!(state.is_drained());
    }

    #[test]
    fn test_outstanding_covers_in_flight_work() {
        let mut state = CrawlState::new();
        state.claim(entry("https://a/1"));
        let next = state.next().unwrap();

        // Queue is empty but a worker still holds a URL
        assert_eq!(state.pending(), 0);
        assert_eq!(state.in_flight(), 1);
        assert!(!state.is_drained());

        state.complete(
            &next.url,
            UrlState::Processed,
            vec![],
            vec![entry("https://a/2")],
        );

        // The child was claimed before the parent stopped counting
        assert!(!state.is_drained());
        assert_eq!(state.pending(), 1);
        assert_eq!(state.in_flight(), 0);

        let child = state.next().unwrap();
        state.complete(&child.url, UrlState::Rejected, vec![], vec![]);
        assert!(state.is_drained());
    }

    #[test]
    fn test_cycle_terminates() {
        let mut state = CrawlState::new();
        state.claim(entry("https://a/1"));

        let first = state.next().unwrap();
        state.complete(&first.url, UrlState::Processed, vec![], vec![entry("https://a/2")]);

        let second = state.next().unwrap();
        state.complete(&second.url, UrlState::Processed, vec![], vec![entry("https://a/1")]);

        assert!(state.next().is_none());
        assert!(state.is_drained());
        assert_eq!(state.stats().urls_processed, 2);
    }

    #[test]
    fn test_records_grouped_by_identity() {
        let mut state = CrawlState::new();
        state.claim(entry("https://a/list"));
        let next = state.next().unwrap();
        state.complete(
            &next.url,
            UrlState::Processed,
            vec![
                record("1", "https://a/list"),
                record("2", "https://a/list"),
                record("1", "https://a/list"),
            ],
            vec![],
        );

        let stats = state.stats();
        assert_eq!(stats.records_accumulated, 3);
        assert_eq!(stats.identities, 2);

        let records = state.take_records();
        assert_eq!(records[&Identity::new(Source::Wowinterface, "1")].len(), 2);
        assert!(state.take_records().is_empty());
    }

    #[test]
    fn test_closed_frontier_rejects_claims() {
        let mut state = CrawlState::new();
        state.close();
        assert!(!state.claim(entry("https://a/1")));
        assert!(state.is_closed());
        assert!(state.is_drained());
    }

    #[test]
    fn test_failure_counters() {
        let mut state = CrawlState::new();
        for url in ["https://a/1", "https://a/2", "https://a/3"] {
            state.claim(entry(url));
        }
        let a = state.next().unwrap();
        let b = state.next().unwrap();
        let c = state.next().unwrap();
        state.complete(&a.url, UrlState::Failed, vec![], vec![]);
        state.complete(&b.url, UrlState::ParseFailed, vec![], vec![]);
        state.complete(&c.url, UrlState::Rejected, vec![], vec![]);

        let stats = state.stats();
        assert_eq!(stats.urls_failed, 1);
        assert_eq!(stats.parse_failures, 1);
        assert_eq!(stats.urls_rejected, 1);
        assert!(state.is_drained());
    }
}
