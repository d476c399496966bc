//! Database schema definitions
//!
//! The fetch queue and the cached page index live in separate database files,
//! each with its own schema.

/// SQL schema for the fetch queue database
pub const QUEUE_SCHEMA_SQL: &str = r#"
-- One row per discovered URL; seq preserves insertion order
CREATE TABLE IF NOT EXISTS fetch_queue (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_fetch_queue_completed ON fetch_queue(completed_at);
"#;

/// SQL schema for the cached page index database
pub const CACHE_SCHEMA_SQL: &str = r#"
-- One row per successful fetch; a URL may appear many times
CREATE TABLE IF NOT EXISTS cached_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    byte_size INTEGER NOT NULL,
    storage_path TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cached_pages_url_fetched ON cached_pages(url, fetched_at);
CREATE INDEX IF NOT EXISTS idx_cached_pages_hash ON cached_pages(content_hash);
"#;

pub fn initialize_queue_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(QUEUE_SCHEMA_SQL)
}

pub fn initialize_cache_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(CACHE_SCHEMA_SQL)
}
