//! Crawl driver - the crawl cycle state machine
//!
//! A cycle starts in [`Phase::Seeding`] (queue reset, entry points enqueued)
//! and then drains the queue one entry at a time:
//! pop → resolve through the content store → extract links → enqueue links
//! and mark the entry completed in one transaction.
//!
//! The driver keeps no state of its own. Which phase a run starts in is
//! derived from the persisted queue alone: if pending entries survive a
//! restart, draining resumes without reseeding.

use crate::config::Config;
use crate::crawler::content_store::{ContentStore, PageSource};
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::rate_limit::RateLimiter;
use crate::crawler::site::{Pages, Site};
use crate::storage::{QueueStore, SqliteFetchQueue, SqlitePageIndex};
use crate::Result;
use chrono::Utc;
use std::time::Duration;

/// Where a crawl cycle starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seeding,
    Draining,
}

/// Outcome of processing one queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub url: String,
    pub source: PageSource,
    /// Links returned by the site
    pub links_found: usize,
    /// Links that were not in the queue yet
    pub newly_enqueued: usize,
    pub extraction_failed: bool,
}

/// Summary of one crawl cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The cycle continued a queue left pending by an earlier run
    pub resumed: bool,
    /// The site had no entry points
    pub idle: bool,
    pub seeded: usize,
    pub visited: usize,
    pub fetched: usize,
    pub cache_hits: usize,
    pub placeholders: usize,
    pub extraction_failures: usize,
    pub discovered: usize,
}

impl CycleReport {
    fn record(&mut self, visit: &Visit) {
        self.visited += 1;
        match visit.source {
            PageSource::Network => self.fetched += 1,
            PageSource::Cache => self.cache_hits += 1,
            PageSource::Placeholder => self.placeholders += 1,
        }
        if visit.extraction_failed {
            self.extraction_failures += 1;
        }
        self.discovered += visit.newly_enqueued;
    }
}

pub struct Driver {
    site: Box<dyn Site>,
    queue: SqliteFetchQueue,
    store: ContentStore,
}

impl Driver {
    pub fn new(site: Box<dyn Site>, queue: SqliteFetchQueue, store: ContentStore) -> Self {
        Self { site, queue, store }
    }

    /// Opens both stores and builds the HTTP fetcher described by `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Validated crawler configuration
    /// * `site` - The site whose links are followed
    ///
    /// # Returns
    ///
    /// * `Ok(Driver)` - Ready to run; pending work from an earlier run is kept
    /// * `Err(CrawlError)` - A database could not be opened or the HTTP client built
    pub fn from_config(config: &Config, site: Box<dyn Site>) -> Result<Self> {
        let queue = SqliteFetchQueue::new(&config.storage.queue_database)?;
        let index = SqlitePageIndex::new(&config.storage.cache_database)?;
        let fetcher = HttpFetcher::from_config(config)?;
        let limiter = RateLimiter::new(config.crawler.min_request_interval());

        let store = ContentStore::new(
            index,
            config.storage.data_dir.clone(),
            Box::new(fetcher),
            limiter,
        );

        Ok(Self::new(site, queue, store))
    }

    /// The site being crawled
    pub fn site(&self) -> &dyn Site {
        self.site.as_ref()
    }

    /// Read access to the fetch queue
    pub fn queue(&self) -> &SqliteFetchQueue {
        &self.queue
    }

    /// Read access to the content store
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// The phase a cycle would start in
    pub fn phase(&self, restart: bool) -> Result<Phase> {
        if restart || !self.queue.has_any_pending()? {
            Ok(Phase::Seeding)
        } else {
            Ok(Phase::Draining)
        }
    }

    /// Resets the queue and enqueues the site's entry points
    ///
    /// Returns `None` when the site has nothing to crawl, otherwise the number
    /// of entries created.
    pub async fn seed(&mut self) -> Result<Option<usize>> {
        self.queue.reset()?;

        let mut pages = Pages::new(&mut self.store, self.site.as_ref());
        let entry_points = self.site.entry_points(&mut pages).await?;

        let Some(urls) = entry_points.into_urls() else {
            tracing::info!("{}: no entry points, nothing to crawl", self.site.name());
            return Ok(None);
        };

        let seeded = self.queue.enqueue_all(&urls)?;
        tracing::info!("{}: seeded {} entry points", self.site.name(), seeded);
        Ok(Some(seeded))
    }

    /// Processes the next pending entry, if any
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Visit))` - One entry was resolved, its links enqueued and the entry completed
    /// * `Ok(None)` - No pending entries remain
    /// * `Err(CrawlError)` - Storage failed; the entry stays pending so a later run retries it
    pub async fn step(&mut self) -> Result<Option<Visit>> {
        let Some(entry) = self.queue.next_pending()? else {
            return Ok(None);
        };
        let url = entry.url;

        let page = self.store.resolve(&url, self.site.as_ref()).await?;

        let (links, extraction_failed) = if page.source == PageSource::Placeholder {
            (Vec::new(), false)
        } else {
            match self.site.extract_links(&url, &page.body) {
                Ok(links) => (links, false),
                Err(e) => {
                    tracing::warn!("Link extraction failed for {}: {}", url, e);
                    (Vec::new(), true)
                }
            }
        };

        let newly_enqueued = self.queue.complete_with_links(&url, &links, Utc::now())?;
        tracing::info!(
            "Parsing done: {} ({} links, {} new)",
            url,
            links.len(),
            newly_enqueued
        );

        Ok(Some(Visit {
            url,
            source: page.source,
            links_found: links.len(),
            newly_enqueued,
            extraction_failed,
        }))
    }

    /// Runs one crawl cycle until no pending entries remain
    ///
    /// # Arguments
    ///
    /// * `restart` - Reseed the queue even if work is pending
    ///
    /// # Returns
    ///
    /// * `Ok(CycleReport)` - Counts for the cycle; `idle` when the site had no entry points
    /// * `Err(CrawlError)` - Storage failed; the cycle stopped with work still pending
    pub async fn run_cycle(&mut self, restart: bool) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        match self.phase(restart)? {
            Phase::Draining => {
                report.resumed = true;
                tracing::info!(
                    "Resuming crawl with {} pending entries",
                    self.queue.count_pending()?
                );
            }
            Phase::Seeding => match self.seed().await? {
                Some(seeded) => report.seeded = seeded,
                None => {
                    report.idle = true;
                    return Ok(report);
                }
            },
        }

        let start_time = std::time::Instant::now();
        while let Some(visit) = self.step().await? {
            report.record(&visit);

            if report.visited % 50 == 0 {
                tracing::info!(
                    "Progress: {} visited, {} pending",
                    report.visited,
                    self.queue.count_pending()?
                );
            }
        }

        tracing::info!(
            "Cycle complete: {} visited ({} fetched, {} cached, {} failed) in {:?}",
            report.visited,
            report.fetched,
            report.cache_hits,
            report.placeholders,
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Runs cycles back to back, pausing `interval` after each one
    ///
    /// Only returns on error; callers stop it by dropping the future.
    ///
    /// # Arguments
    ///
    /// * `interval` - Pause after every cycle, idle or not
    /// * `restart` - Reseed the first cycle even if work is pending
    pub async fn run_forever(&mut self, interval: Duration, restart: bool) -> Result<()> {
        let mut restart = restart;
        loop {
            let report = self.run_cycle(restart).await?;
            restart = false;

            if report.idle {
                tracing::info!("Idle cycle, next attempt in {:?}", interval);
            } else {
                tracing::info!("Next cycle in {:?}", interval);
            }
            tokio::time::sleep(interval).await;
        }
    }
}
