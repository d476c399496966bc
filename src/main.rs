//! cache-crawler main entry point
//!
//! This is the command-line interface for the resumable caching crawler.

use anyhow::Context;
use cache_crawler::config::{load_config_with_hash, Config, SiteConfig};
use cache_crawler::crawler::build_driver;
use cache_crawler::output::{load_statistics, print_cycle_report, print_history, print_statistics};
use cache_crawler::storage::{PageIndex, SqliteFetchQueue, SqlitePageIndex};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// cache-crawler: a resumable, polite, caching web crawler
///
/// cache-crawler follows links from a site's entry points, fetching each URL
/// once per cycle, spacing requests by a global minimum interval, and keeping
/// every distinct version of every page on disk. Interrupted cycles resume
/// where they stopped.
#[derive(Parser, Debug)]
#[command(name = "cache-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A resumable, polite, caching web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Reseed the first cycle even if a previous run left work pending
    #[arg(long)]
    fresh: bool,

    /// Run a single crawl cycle and exit
    #[arg(long)]
    once: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "history"])]
    dry_run: bool,

    /// Show statistics from the databases and exit
    #[arg(long, conflicts_with_all = ["dry_run", "history"])]
    stats: bool,

    /// Show every cached fetch of URL and exit
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "stats"])]
    history: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(url) = &cli.history {
        handle_history(&config, url)?;
    } else {
        handle_crawl(&config, cli.fresh, cli.once).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cache_crawler=info,warn"),
            1 => EnvFilter::new("cache_crawler=debug,info"),
            2 => EnvFilter::new("cache_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== cache-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Minimum request interval: {}ms",
        config.crawler.min_request_interval_ms
    );
    println!("  Cycle interval: {}s", config.crawler.cycle_interval_secs);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Blob directory: {}", config.storage.data_dir.display());
    println!("  Queue database: {}", config.storage.queue_database.display());
    println!("  Cache database: {}", config.storage.cache_database.display());

    println!("\nSite:");
    match &config.site {
        SiteConfig::Ptt { base_url } => {
            println!("  PTT at {}", base_url);
            println!(
                "  Entry points: boards listed on {}/bbs/hotboards.html",
                base_url.trim_end_matches('/')
            );
        }
        SiteConfig::SameHost { seeds } => {
            println!("  Same-host crawl ({} seeds)", seeds.len());
            for seed in seeds {
                println!("    * {}", seed);
            }
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from both databases
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Queue database: {}", config.storage.queue_database.display());
    println!("Cache database: {}\n", config.storage.cache_database.display());

    let queue = SqliteFetchQueue::new(&config.storage.queue_database)
        .context("Failed to open the queue database")?;
    let index = SqlitePageIndex::new(&config.storage.cache_database)
        .context("Failed to open the cache database")?;

    let stats = load_statistics(&queue, &index)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --history mode: lists every cached fetch of one URL
fn handle_history(config: &Config, url: &str) -> anyhow::Result<()> {
    let index = SqlitePageIndex::new(&config.storage.cache_database)
        .context("Failed to open the cache database")?;

    let pages = index.history_for_url(url)?;
    print_history(url, &pages);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, fresh: bool, once: bool) -> anyhow::Result<()> {
    let mut driver = build_driver(config).context("Failed to set up the crawler")?;
    tracing::info!(
        "Crawling site {} (blobs under {})",
        driver.site().name(),
        driver.store().data_dir().display()
    );

    if fresh {
        tracing::info!("Starting fresh crawl (ignoring pending work)");
    } else {
        tracing::info!("Starting crawl (will resume pending work)");
    }

    if once {
        let report = driver.run_cycle(fresh).await.map_err(|e| {
            tracing::error!("Crawl failed: {}", e);
            e
        })?;
        print_cycle_report(&report);
        return Ok(());
    }

    let interval = config.crawler.cycle_interval();
    tokio::select! {
        result = driver.run_forever(interval, fresh) => {
            if let Err(e) = &result {
                tracing::error!("Crawl failed: {}", e);
            }
            result?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, stopping crawl");
        }
    }

    Ok(())
}
