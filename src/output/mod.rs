//! Output module for crawl reports
//!
//! This module handles:
//! - Statistics over the fetch queue and the page cache
//! - The fetch history of a single URL
//! - The summary of a finished crawl cycle

mod history;
pub mod stats;

pub use history::{print_cycle_report, print_history};
pub use stats::{format_bytes, load_statistics, print_statistics, CrawlStatistics};
