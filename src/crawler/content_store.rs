//! Content-addressed page cache
//!
//! The content store answers "give me the bytes of this URL". A URL that has
//! been fetched successfully once is served from disk forever after; there is
//! no revalidation. On a miss the store throttles, fetches, hashes the body,
//! writes the blob and only then records the fetch in the index, so the index
//! never points at a blob that does not exist.

use crate::crawler::fetcher::{FetchResult, PageFetcher};
use crate::crawler::rate_limit::RateLimiter;
use crate::crawler::site::Site;
use crate::storage::{CachedPage, PageIndex, SqlitePageIndex, StorageError, StorageResult};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Body handed to the site when a fetch fails
pub const PLACEHOLDER_PAGE: &[u8] = b"<html></html>";

/// Where the bytes of a resolved page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageSource {
    /// Served from a previously written blob
    Cache,
    /// Fetched from the network and stored
    Network,
    /// The fetch failed; the body is [`PLACEHOLDER_PAGE`]
    Placeholder,
}

/// A page returned by the content store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub body: Vec<u8>,
    pub source: PageSource,
}

impl Resolved {
    fn placeholder() -> Self {
        Self {
            body: PLACEHOLDER_PAGE.to_vec(),
            source: PageSource::Placeholder,
        }
    }
}

/// Hex-encoded SHA-256 of a page body
pub fn content_hash(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

pub struct ContentStore {
    index: SqlitePageIndex,
    data_dir: PathBuf,
    fetcher: Box<dyn PageFetcher>,
    limiter: RateLimiter,
}

impl ContentStore {
    /// Creates a content store
    ///
    /// # Arguments
    ///
    /// * `index` - The cache index recording every successful fetch
    /// * `data_dir` - Directory blobs are written under
    /// * `fetcher` - Network access for cache misses
    /// * `limiter` - Gate every outbound request passes through
    pub fn new(
        index: SqlitePageIndex,
        data_dir: impl Into<PathBuf>,
        fetcher: Box<dyn PageFetcher>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            index,
            data_dir: data_dir.into(),
            fetcher,
            limiter,
        }
    }

    /// Read access to the cache index
    pub fn index(&self) -> &SqlitePageIndex {
        &self.index
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute location of a cached page's blob
    pub fn blob_path(&self, page: &CachedPage) -> PathBuf {
        self.data_dir.join(&page.storage_path)
    }

    /// Bytes of the most recent fetch of `url`, if its blob is still readable
    pub fn cached(&self, url: &str) -> StorageResult<Option<Vec<u8>>> {
        let Some(page) = self.index.latest_for_url(url)? else {
            return Ok(None);
        };

        let path = self.blob_path(&page);
        match fs::read(&path) {
            Ok(body) => Ok(Some(body)),
            Err(e) => {
                tracing::warn!(
                    "Cached blob {} for {} is unreadable ({}), fetching again",
                    path.display(),
                    url,
                    e
                );
                Ok(None)
            }
        }
    }

    /// Returns the bytes of `url`, from the cache when possible
    ///
    /// # Arguments
    ///
    /// * `url` - The page to resolve
    /// * `site` - Supplies request parameters and the blob layout on a miss
    ///
    /// # Returns
    ///
    /// * `Ok(Resolved)` - The page bytes and whether they came from the cache,
    ///   the network, or the placeholder page after a failed fetch
    /// * `Err(StorageError)` - A blob or index write failed; nothing was recorded
    pub async fn resolve(&mut self, url: &str, site: &dyn Site) -> StorageResult<Resolved> {
        if let Some(body) = self.cached(url)? {
            tracing::debug!("Cache hit for {}", url);
            return Ok(Resolved {
                body,
                source: PageSource::Cache,
            });
        }

        self.fetch_and_store(url, site).await
    }

    /// Fetches `url` again even if it is cached
    ///
    /// Changed content lands in a new blob with a new index record; earlier
    /// blobs are left as they are.
    ///
    /// # Returns
    ///
    /// * `Ok(Resolved)` - The fresh bytes, or the placeholder page if the fetch failed
    /// * `Err(StorageError)` - A blob or index write failed
    pub async fn refresh(&mut self, url: &str, site: &dyn Site) -> StorageResult<Resolved> {
        self.fetch_and_store(url, site).await
    }

    async fn fetch_and_store(&mut self, url: &str, site: &dyn Site) -> StorageResult<Resolved> {
        self.limiter.throttle().await;

        let fetched_at = Utc::now();
        tracing::info!("Request {}", url);

        let params = site.request_params(url);
        let body = match self.fetcher.fetch(url, &params).await {
            FetchResult::Success { final_url, body } => {
                if final_url != url {
                    tracing::debug!("{} redirected to {}", url, final_url);
                }
                body
            }
            FetchResult::HttpError { status_code } => {
                tracing::warn!("HTTP {} for {}, using placeholder page", status_code, url);
                return Ok(Resolved::placeholder());
            }
            FetchResult::NetworkError { error, timed_out } => {
                if timed_out {
                    tracing::warn!("Request to {} timed out, using placeholder page", url);
                } else {
                    tracing::warn!("Request to {} failed ({}), using placeholder page", url, error);
                }
                return Ok(Resolved::placeholder());
            }
        };

        let hash = content_hash(&body);
        let relative = site.path_for(url, &hash);
        let path = self.write_blob(&relative, &body)?;

        let page = self
            .index
            .record_page(url, &hash, body.len() as u64, &relative, fetched_at)?;
        tracing::debug!(
            "Stored {} ({} bytes, {}) at {}",
            page.url,
            page.byte_size,
            page.content_hash,
            path.display()
        );

        Ok(Resolved {
            body,
            source: PageSource::Network,
        })
    }

    /// Writes a blob under the data directory via a temporary file and rename
    fn write_blob(&self, relative: &str, body: &[u8]) -> StorageResult<PathBuf> {
        let relative = checked_relative_path(relative)?;
        let path = self.data_dir.join(relative);

        let parent = path.parent().unwrap_or(&self.data_dir).to_path_buf();
        // An existing directory is fine; anything else (permissions, a file
        // in the way) is fatal for this fetch.
        fs::create_dir_all(&parent).map_err(|source| StorageError::Blob {
            path: parent.clone(),
            source,
        })?;

        let file_name = path
            .file_name()
            .ok_or_else(|| StorageError::UnsafePath(relative.display().to_string()))?;
        let tmp = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

        write_synced(&tmp, body).map_err(|source| StorageError::Blob {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StorageError::Blob {
            path: path.clone(),
            source,
        })?;
        // The rename is durable only once the directory entry is flushed
        sync_dir(&parent).map_err(|source| StorageError::Blob {
            path: parent.clone(),
            source,
        })?;

        Ok(path)
    }
}

fn write_synced(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(body)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Rejects absolute paths, `..` and paths without a file name
fn checked_relative_path(relative: &str) -> StorageResult<&Path> {
    let path = Path::new(relative);
    let mut has_file = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => has_file = true,
            Component::CurDir => {}
            _ => return Err(StorageError::UnsafePath(relative.to_string())),
        }
    }

    if !has_file {
        return Err(StorageError::UnsafePath(relative.to_string()));
    }
    Ok(path)
}
