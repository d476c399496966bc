//! Crawler module: fetching, caching and the crawl cycle
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with per-site request parameters
//! - The global rate limiter
//! - The content-addressed page cache
//! - The crawl driver that seeds and drains the fetch queue

mod content_store;
mod driver;
mod fetcher;
mod rate_limit;
mod site;

#[cfg(test)]
mod testing;

pub use content_store::{content_hash, ContentStore, PageSource, Resolved, PLACEHOLDER_PAGE};
pub use driver::{CycleReport, Driver, Phase, Visit};
pub use fetcher::{build_http_client, FetchResult, HttpFetcher, PageFetcher, RequestParams};
pub use rate_limit::{RateLimiter, DEFAULT_MIN_INTERVAL};
pub use site::{default_blob_name, EntryPoints, Pages, Site};

use crate::config::Config;
use crate::sites::build_site;

/// Builds a driver for the site described by `config`
///
/// # Arguments
///
/// * `config` - Validated crawler configuration
///
/// # Returns
///
/// * `Ok(Driver)` - Driver over the configured site and stores
/// * `Err(CrawlError)` - Invalid site settings, or the stores could not be opened
pub fn build_driver(config: &Config) -> crate::Result<Driver> {
    let site = build_site(&config.site)?;
    Driver::from_config(config, site)
}
