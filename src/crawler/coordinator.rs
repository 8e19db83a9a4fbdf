//! Crawl coordinator: the worker pool and the completion loop
//!
//! A fixed number of long-lived workers pull URLs off the shared frontier.
//! Each worker fetches through the retry policy, hands the body to the
//! source's parser, then reports records and discovered URLs back to the
//! shared state in one critical section.
//!
//! The coordinator itself only watches. It wakes on every completion, on a
//! fixed poll interval and on cancellation, and closes the frontier once no
//! URL is outstanding.

use crate::cancel::CancelSignal;
use crate::config::CrawlerConfig;
use crate::http::{FetchError, Fetcher, RetryPolicy};
use crate::model::{Identity, PartialRecord};
use crate::parser::ParserRegistry;
use crate::state::{CrawlState, CrawlStats, FrontierEntry, UrlState};
use crate::{CatalogueError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Everything a finished crawl hands to the merge step
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub records: HashMap<Identity, Vec<PartialRecord>>,
    pub stats: CrawlStats,
}

struct Shared {
    state: Mutex<CrawlState>,
    /// Wakes idle workers: new URLs or a closed frontier
    work: Notify,
    /// Wakes the coordinator after a URL completes
    progress: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CrawlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-worker view of the run; cheap to share behind an `Arc`
struct WorkerContext {
    shared: Arc<Shared>,
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    parsers: ParserRegistry,
    cancel: CancelSignal,
}

/// What happened to one URL
struct Completion {
    state: UrlState,
    records: Vec<PartialRecord>,
    discovered: Vec<FrontierEntry>,
}

impl Completion {
    fn empty(state: UrlState) -> Self {
        Self {
            state,
            records: Vec::new(),
            discovered: Vec::new(),
        }
    }
}

pub struct Coordinator {
    config: CrawlerConfig,
    policy: RetryPolicy,
    fetcher: Arc<dyn Fetcher>,
    parsers: ParserRegistry,
    cancel: CancelSignal,
}

impl Coordinator {
    pub fn new(
        config: CrawlerConfig,
        policy: RetryPolicy,
        fetcher: Arc<dyn Fetcher>,
        parsers: ParserRegistry,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            config,
            policy,
            fetcher,
            parsers,
            cancel,
        }
    }

    /// Crawls from `seeds` until nothing is outstanding
    ///
    /// Returns [`CatalogueError::Cancelled`] if the cancel signal fires
    /// first; partial results are discarded in that case.
    pub async fn run(&self, seeds: Vec<FrontierEntry>) -> Result<CrawlOutcome> {
        let shared = Arc::new(Shared {
            state: Mutex::new(CrawlState::new()),
            work: Notify::new(),
            progress: Notify::new(),
        });

        {
            let mut state = shared.lock();
            for seed in seeds {
                tracing::debug!(url = %seed.url, source = %seed.source, "Seeding frontier");
                state.claim(seed);
            }
        }

        let workers = self.config.workers.max(1);
        tracing::info!(
            workers,
            seeds = shared.lock().pending(),
            "Starting crawl"
        );

        let context = Arc::new(WorkerContext {
            shared: Arc::clone(&shared),
            fetcher: Arc::clone(&self.fetcher),
            policy: self.policy,
            parsers: self.parsers.clone(),
            cancel: self.cancel.clone(),
        });

        let mut pool = JoinSet::new();
        for id in 0..workers {
            pool.spawn(worker(id, Arc::clone(&context)));
        }

        let poll_every = self.config.poll_interval();
        let status_every = self.config.status_interval();
        let mut poll = interval_at(Instant::now() + poll_every, poll_every);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut status = interval_at(Instant::now() + status_every, status_every);
        status.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let started = std::time::Instant::now();
        let cancelled = loop {
            if self.cancel.is_cancelled() {
                break true;
            }

            {
                let mut state = shared.lock();
                if state.is_drained() {
                    state.close();
                    break false;
                }
            }

            tokio::select! {
                _ = shared.progress.notified() => {}
                _ = poll.tick() => {}
                _ = status.tick() => {
                    let (pending, in_flight) = {
                        let state = shared.lock();
                        (state.pending(), state.in_flight())
                    };
                    tracing::info!(pending, in_flight, workers, "Crawl status");
                }
                _ = self.cancel.cancelled() => {}
            }
        };

        // Closed frontier or fired signal: either way idle workers must wake to exit
        shared.lock().close();
        shared.work.notify_waiters();

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Crawl worker panicked");
            }
        }

        if cancelled {
            tracing::warn!("Crawl cancelled");
            return Err(CatalogueError::Cancelled);
        }

        let mut state = shared.lock();
        let stats = state.stats();
        let records = state.take_records();

        tracing::info!(
            processed = stats.urls_processed,
            rejected = stats.urls_rejected,
            failed = stats.urls_failed,
            parse_failures = stats.parse_failures,
            identities = stats.identities,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Crawl complete"
        );

        Ok(CrawlOutcome { records, stats })
    }
}

async fn worker(id: usize, ctx: Arc<WorkerContext>) {
    tracing::trace!(worker = id, "Worker started");

    loop {
        let notified = ctx.shared.work.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let next = {
            let mut state = ctx.shared.lock();
            if state.is_closed() {
                break;
            }
            state.next()
        };

        let entry = match next {
            Some(entry) => entry,
            None => {
                tokio::select! {
                    _ = notified.as_mut() => continue,
                    _ = ctx.cancel.cancelled() => break,
                }
            }
        };

        tracing::debug!(worker = id, url = %entry.url, "Fetching");
        let completion = process(&ctx, &entry).await;
        let found_work = !completion.discovered.is_empty();

        ctx.shared.lock().complete(
            &entry.url,
            completion.state,
            completion.records,
            completion.discovered,
        );

        if found_work {
            ctx.shared.work.notify_waiters();
        }
        ctx.shared.progress.notify_one();

        if ctx.cancel.is_cancelled() {
            break;
        }
    }

    tracing::trace!(worker = id, "Worker stopped");
}

async fn process(ctx: &WorkerContext, entry: &FrontierEntry) -> Completion {
    let url = entry.url.as_str();

    let parser = match ctx.parsers.get(entry.source) {
        Some(parser) => parser,
        None => {
            tracing::warn!(url = %url, source = %entry.source, "No parser registered for source");
            return Completion::empty(UrlState::ParseFailed);
        }
    };

    let response = match ctx.policy.fetch(ctx.fetcher.as_ref(), url, &ctx.cancel).await {
        Ok(response) => response,
        Err(FetchError::Cancelled) => {
            tracing::debug!(url = %url, "Fetch cancelled");
            return Completion::empty(UrlState::Failed);
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Fetch failed");
            return Completion::empty(UrlState::Failed);
        }
    };

    if !response.is_success() {
        if response.status == 404 {
            tracing::debug!(url = %url, status = response.status, "Not found");
        } else {
            tracing::warn!(url = %url, status = response.status, "Unusable response");
        }
        return Completion::empty(UrlState::Rejected);
    }

    match parser.parse(url, &response.body) {
        Ok(output) => {
            tracing::debug!(
                url = %url,
                records = output.records.len(),
                urls = output.urls.len(),
                "Parsed"
            );
            Completion {
                state: UrlState::Processed,
                discovered: output
                    .urls
                    .into_iter()
                    .map(|found| FrontierEntry::new(entry.source, found))
                    .collect(),
                records: output.records,
            }
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Parse failed");
            Completion::empty(UrlState::ParseFailed)
        }
    }
}
