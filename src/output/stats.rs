//! Statistics generation from the crawl databases
//!
//! This module provides functionality for extracting and displaying
//! statistics from the fetch queue and the cache index.

use crate::storage::{PageIndex, QueueStore, StorageResult};
use chrono::{DateTime, Utc};

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Entries in the fetch queue
    pub total_entries: u64,

    /// Entries still waiting to be processed
    pub pending: u64,

    /// Entries processed in the current cycle
    pub completed: u64,

    /// Fetches recorded in the cache index
    pub cached_pages: u64,

    /// Distinct URLs with at least one cached fetch
    pub distinct_urls: u64,

    /// Bytes of page content stored on disk
    pub total_bytes: u64,

    /// Time of the most recent fetch
    pub latest_fetch: Option<DateTime<Utc>>,
}

/// Loads statistics from both stores
///
/// # Arguments
///
/// * `queue` - The fetch queue
/// * `index` - The cached page index
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(
    queue: &dyn QueueStore,
    index: &dyn PageIndex,
) -> StorageResult<CrawlStatistics> {
    let total_entries = queue.count_total()?;
    let pending = queue.count_pending()?;

    Ok(CrawlStatistics {
        total_entries,
        pending,
        completed: total_entries.saturating_sub(pending),
        cached_pages: index.count_pages()?,
        distinct_urls: index.count_distinct_urls()?,
        total_bytes: index.total_bytes()?,
        latest_fetch: index.latest_fetch_time()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Fetch Queue:");
    println!("  Total entries: {}", stats.total_entries);
    println!("  Pending: {}", stats.pending);
    let percentage = if stats.total_entries > 0 {
        (stats.completed as f64 / stats.total_entries as f64) * 100.0
    } else {
        0.0
    };
    println!("  Completed: {} ({:.1}%)", stats.completed, percentage);
    println!();

    println!("Page Cache:");
    println!("  Cached fetches: {}", stats.cached_pages);
    println!("  Distinct URLs: {}", stats.distinct_urls);
    println!("  Stored: {}", format_bytes(stats.total_bytes));
    match stats.latest_fetch {
        Some(at) => println!("  Most recent fetch: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Most recent fetch: never"),
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
