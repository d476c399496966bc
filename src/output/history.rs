//! Fetch history of a single URL

use crate::crawler::CycleReport;
use crate::output::stats::format_bytes;
use crate::storage::CachedPage;

/// Prints every cached fetch of `url`, newest first
pub fn print_history(url: &str, pages: &[CachedPage]) {
    println!("=== Fetch History: {} ===\n", url);

    if pages.is_empty() {
        println!("  No cached fetches");
        return;
    }

    for line in history_lines(pages) {
        println!("  {}", line);
    }
}

fn history_lines(pages: &[CachedPage]) -> Vec<String> {
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            // A fetch changed the content if it differs from the next older one
            let changed = match pages.get(i + 1) {
                Some(older) if older.content_hash == page.content_hash => "",
                Some(_) => " (changed)",
                None => " (first)",
            };
            format!(
                "{}  {}  {:>10}  {}{}",
                page.fetched_at.format("%Y-%m-%d %H:%M:%S"),
                &page.content_hash[..page.content_hash.len().min(12)],
                format_bytes(page.byte_size),
                page.storage_path,
                changed
            )
        })
        .collect()
}

/// Prints the summary of one crawl cycle
pub fn print_cycle_report(report: &CycleReport) {
    if report.idle {
        println!("Nothing to crawl: the site returned no entry points");
        return;
    }

    println!("=== Crawl Cycle ===\n");
    if report.resumed {
        println!("  Resumed pending work from a previous run");
    } else {
        println!("  Entry points seeded: {}", report.seeded);
    }
    println!("  Pages visited: {}", report.visited);
    println!("    fetched: {}", report.fetched);
    println!("    from cache: {}", report.cache_hits);
    println!("    unreachable: {}", report.placeholders);
    println!("  Extraction failures: {}", report.extraction_failures);
    println!("  New URLs discovered: {}", report.discovered);
}
