//! SQLite storage implementation
//!
//! This module provides SQLite-based implementations of the queue and cache
//! index traits. Each store owns its own database file.

use crate::storage::schema::{initialize_cache_schema, initialize_queue_schema};
use crate::storage::traits::{PageIndex, QueueStore, StorageError, StorageResult};
use crate::storage::{format_timestamp, parse_timestamp, CachedPage, FetchEntry};
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Opens a database file, creating its parent directory if needed
fn open_connection(path: &Path) -> StorageResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;

    // Each commit is flushed to disk before returning
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = FULL;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    Ok(conn)
}

fn entry_from_parts(url: String, completed_at: Option<String>) -> StorageResult<FetchEntry> {
    let completed_at = completed_at.as_deref().map(parse_timestamp).transpose()?;
    Ok(FetchEntry { url, completed_at })
}

// ===== Fetch Queue =====

/// SQLite-backed fetch queue
pub struct SqliteFetchQueue {
    conn: Connection,
}

impl SqliteFetchQueue {
    /// Opens or creates the queue database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; missing parent directories are created
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteFetchQueue)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open the database or create its schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = open_connection(path)?;
        initialize_queue_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory queue (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_queue_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl QueueStore for SqliteFetchQueue {
    fn enqueue_if_absent(&mut self, url: &str) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO fetch_queue (url) VALUES (?1)",
            params![url],
        )?;
        Ok(inserted > 0)
    }

    fn enqueue_all(&mut self, urls: &[String]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO fetch_queue (url) VALUES (?1)")?;
            for url in urls {
                inserted += stmt.execute(params![url])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn next_pending(&self) -> StorageResult<Option<FetchEntry>> {
        let row: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT url, completed_at FROM fetch_queue
                 WHERE completed_at IS NULL ORDER BY seq ASC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(url, completed_at)| entry_from_parts(url, completed_at))
            .transpose()
    }

    fn mark_completed(&mut self, url: &str, at: DateTime<Utc>) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE fetch_queue SET completed_at = ?1 WHERE url = ?2",
            params![format_timestamp(&at), url],
        )?;

        if updated == 0 {
            return Err(StorageError::EntryNotFound(url.to_string()));
        }
        Ok(())
    }

    fn complete_with_links(
        &mut self,
        url: &str,
        links: &[String],
        at: DateTime<Utc>,
    ) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO fetch_queue (url) VALUES (?1)")?;
            for link in links {
                inserted += stmt.execute(params![link])?;
            }
        }

        let updated = tx.execute(
            "UPDATE fetch_queue SET completed_at = ?1 WHERE url = ?2",
            params![format_timestamp(&at), url],
        )?;
        if updated == 0 {
            // Dropping the transaction rolls back the inserted links
            return Err(StorageError::EntryNotFound(url.to_string()));
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn reset(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM fetch_queue", [])?;
        Ok(())
    }

    fn has_any_pending(&self) -> StorageResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM fetch_queue WHERE completed_at IS NULL)",
            [],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn get(&self, url: &str) -> StorageResult<Option<FetchEntry>> {
        let row: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT url, completed_at FROM fetch_queue WHERE url = ?1",
                params![url],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(url, completed_at)| entry_from_parts(url, completed_at))
            .transpose()
    }

    fn pending(&self) -> StorageResult<Vec<FetchEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, completed_at FROM fetch_queue
             WHERE completed_at IS NULL ORDER BY seq ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(url, completed_at)| entry_from_parts(url, completed_at))
            .collect()
    }

    fn count_total(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fetch_queue", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_pending(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM fetch_queue WHERE completed_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

// ===== Cached Page Index =====

type CachedPageRow = (i64, String, String, i64, String, String);

const CACHED_PAGE_COLUMNS: &str = "id, url, content_hash, byte_size, storage_path, fetched_at";

fn read_cached_page_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CachedPageRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn cached_page_from_row(row: CachedPageRow) -> StorageResult<CachedPage> {
    let (id, url, content_hash, byte_size, storage_path, fetched_at) = row;
    Ok(CachedPage {
        id,
        url,
        content_hash,
        byte_size: byte_size as u64,
        storage_path,
        fetched_at: parse_timestamp(&fetched_at)?,
    })
}

/// SQLite-backed cached page index
pub struct SqlitePageIndex {
    conn: Connection,
}

impl SqlitePageIndex {
    /// Opens or creates the cache index database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; missing parent directories are created
    ///
    /// # Returns
    ///
    /// * `Ok(SqlitePageIndex)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open the database or create its schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = open_connection(path)?;
        initialize_cache_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory index (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_cache_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl PageIndex for SqlitePageIndex {
    fn record_page(
        &mut self,
        url: &str,
        content_hash: &str,
        byte_size: u64,
        storage_path: &str,
        fetched_at: DateTime<Utc>,
    ) -> StorageResult<CachedPage> {
        // Stored timestamps carry microseconds
        let fetched_at = fetched_at.trunc_subsecs(6);
        self.conn.execute(
            "INSERT INTO cached_pages (url, content_hash, byte_size, storage_path, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                url,
                content_hash,
                byte_size as i64,
                storage_path,
                format_timestamp(&fetched_at)
            ],
        )?;

        Ok(CachedPage {
            id: self.conn.last_insert_rowid(),
            url: url.to_string(),
            content_hash: content_hash.to_string(),
            byte_size,
            storage_path: storage_path.to_string(),
            fetched_at,
        })
    }

    fn latest_for_url(&self, url: &str) -> StorageResult<Option<CachedPage>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM cached_pages WHERE url = ?1
                     ORDER BY fetched_at DESC, id DESC LIMIT 1",
                    CACHED_PAGE_COLUMNS
                ),
                params![url],
                read_cached_page_row,
            )
            .optional()?;

        row.map(cached_page_from_row).transpose()
    }

    fn history_for_url(&self, url: &str) -> StorageResult<Vec<CachedPage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cached_pages WHERE url = ?1 ORDER BY fetched_at DESC, id DESC",
            CACHED_PAGE_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![url], read_cached_page_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(cached_page_from_row).collect()
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cached_pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_distinct_urls(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT url) FROM cached_pages", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    fn total_bytes(&self) -> StorageResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(byte_size), 0) FROM cached_pages",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    fn latest_fetch_time(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let latest: Option<String> =
            self.conn
                .query_row("SELECT MAX(fetched_at) FROM cached_pages", [], |row| {
                    row.get(0)
                })?;
        latest.as_deref().map(parse_timestamp).transpose()
    }
}
