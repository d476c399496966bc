//! Storage module for persisting crawl state
//!
//! Two independent SQLite databases hold all durable state:
//! - the fetch queue (one row per URL, pending or completed)
//! - the cached page index (one row per successful fetch)
//!
//! The page bytes themselves live as files under the blob directory, which is
//! managed by [`crate::crawler::ContentStore`].

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{SqliteFetchQueue, SqlitePageIndex};
pub use traits::{PageIndex, QueueStore, StorageError, StorageResult};

use chrono::{DateTime, SecondsFormat, Utc};

/// A URL in the fetch queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEntry {
    pub url: String,
    pub completed_at: Option<DateTime<Utc>>,
}

impl FetchEntry {
    pub fn is_pending(&self) -> bool {
        self.completed_at.is_none()
    }
}

/// One successful fetch of a URL, as recorded in the cache index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub id: i64,
    pub url: String,
    /// Hex-encoded SHA-256 of the page body
    pub content_hash: String,
    pub byte_size: u64,
    /// Location of the blob, relative to the blob directory
    pub storage_path: String,
    pub fetched_at: DateTime<Utc>,
}

/// Formats a timestamp for storage
///
/// Fixed-width RFC 3339 with microseconds and a `Z` suffix, so that string
/// order in SQLite matches chronological order.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a timestamp written by [`format_timestamp`]
pub(crate) fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("bad timestamp '{}': {}", value, e)))
}
