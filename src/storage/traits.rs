//! Storage traits and error types
//!
//! This module defines the trait interfaces for the two durable stores and
//! their shared error type.

use crate::storage::{CachedPage, FetchEntry};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Queue entry not found: {0}")]
    EntryNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Refusing to store page outside the data directory: {0}")]
    UnsafePath(String),

    #[error("Failed to write blob {path}: {source}")]
    Blob {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable work list of URLs to visit
///
/// URLs are compared as exact strings; no normalization happens here.
pub trait QueueStore {
    /// Inserts a pending entry unless one already exists for `url`
    ///
    /// Returns `true` if a new entry was created.
    fn enqueue_if_absent(&mut self, url: &str) -> StorageResult<bool>;

    /// Inserts every absent URL in one transaction
    ///
    /// Returns the number of entries created.
    fn enqueue_all(&mut self, urls: &[String]) -> StorageResult<usize>;

    /// Returns the oldest pending entry, if any
    fn next_pending(&self) -> StorageResult<Option<FetchEntry>>;

    /// Sets the completion timestamp of an existing entry
    fn mark_completed(&mut self, url: &str, at: DateTime<Utc>) -> StorageResult<()>;

    /// Enqueues the links found on `url` and marks it completed, atomically
    ///
    /// Returns the number of new entries created from `links`.
    fn complete_with_links(
        &mut self,
        url: &str,
        links: &[String],
        at: DateTime<Utc>,
    ) -> StorageResult<usize>;

    /// Removes every entry
    fn reset(&mut self) -> StorageResult<()>;

    /// Whether at least one entry has no completion timestamp
    fn has_any_pending(&self) -> StorageResult<bool>;

    /// Looks up a single entry
    fn get(&self, url: &str) -> StorageResult<Option<FetchEntry>>;

    /// All pending entries, oldest first
    fn pending(&self) -> StorageResult<Vec<FetchEntry>>;

    fn count_total(&self) -> StorageResult<u64>;

    fn count_pending(&self) -> StorageResult<u64>;
}

/// Index of cached page fetches
pub trait PageIndex {
    /// Records a fetch whose blob has already been written
    fn record_page(
        &mut self,
        url: &str,
        content_hash: &str,
        byte_size: u64,
        storage_path: &str,
        fetched_at: DateTime<Utc>,
    ) -> StorageResult<CachedPage>;

    /// The most recent fetch of `url`
    fn latest_for_url(&self, url: &str) -> StorageResult<Option<CachedPage>>;

    /// Every fetch of `url`, newest first
    fn history_for_url(&self, url: &str) -> StorageResult<Vec<CachedPage>>;

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64>;

    fn count_distinct_urls(&self) -> StorageResult<u64>;

    /// Sum of `byte_size` across all records
    fn total_bytes(&self) -> StorageResult<u64>;

    /// Timestamp of the most recent fetch of any URL
    fn latest_fetch_time(&self) -> StorageResult<Option<DateTime<Utc>>>;
}
