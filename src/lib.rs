//! cache-crawler: a resumable, polite, content-addressed web crawler
//!
//! This crate crawls a site by following links from a set of entry points,
//! fetching each URL once, caching the raw bytes on disk keyed by content
//! hash, and persisting its fetch queue so that a restart resumes where the
//! previous process stopped.

pub mod config;
pub mod crawler;
pub mod output;
pub mod sites;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised by a site collaborator while discovering links
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Page {url} is not valid UTF-8")]
    Encoding { url: String },
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{ContentStore, Driver, EntryPoints, RateLimiter, Site};
pub use storage::{CachedPage, FetchEntry};
