use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub site: SiteConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between two outbound requests (milliseconds)
    #[serde(rename = "min-request-interval-ms", default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// Pause between two crawl cycles when running forever (seconds)
    #[serde(rename = "cycle-interval-secs", default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Timeout applied to every HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl CrawlerConfig {
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            min_request_interval_ms: default_min_request_interval_ms(),
            cycle_interval_secs: default_cycle_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_min_request_interval_ms() -> u64 {
    500
}

fn default_cycle_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Locations of the durable stores
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the cached page blobs
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite database holding the fetch queue
    #[serde(rename = "queue-database", default = "default_queue_database")]
    pub queue_database: PathBuf,

    /// SQLite database holding the cached page index
    #[serde(rename = "cache-database", default = "default_cache_database")]
    pub cache_database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            queue_database: default_queue_database(),
            cache_database: default_cache_database(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_queue_database() -> PathBuf {
    PathBuf::from("./db/fetch_queue.db")
}

fn default_cache_database() -> PathBuf {
    PathBuf::from("./db/crawler.db")
}

/// Which site collaborator drives link discovery
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SiteConfig {
    /// The PTT bulletin board web frontend
    Ptt {
        #[serde(rename = "base-url", default = "default_ptt_base_url")]
        base_url: String,
    },

    /// Any site: follow links that stay on the seed's host
    SameHost { seeds: Vec<String> },
}

fn default_ptt_base_url() -> String {
    "https://www.ptt.cc".to_string()
}
