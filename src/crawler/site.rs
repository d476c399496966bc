//! The site collaborator interface
//!
//! Everything specific to one website lives behind [`Site`]: where a crawl
//! starts, which links on a page are worth following, which cookies or
//! headers every request needs, and how cached blobs are laid out on disk.

use crate::crawler::content_store::ContentStore;
use crate::crawler::fetcher::RequestParams;
use crate::SiteError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Seeds supplied at the start of a crawl cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoints {
    /// Nothing to crawl this cycle
    None,
    One(String),
    Many(Vec<String>),
}

impl EntryPoints {
    /// The seed URLs, or `None` when the cycle has nothing to do
    pub fn into_urls(self) -> Option<Vec<String>> {
        match self {
            Self::None => None,
            Self::One(url) => Some(vec![url]),
            Self::Many(urls) if urls.is_empty() => None,
            Self::Many(urls) => Some(urls),
        }
    }
}

impl From<String> for EntryPoints {
    fn from(url: String) -> Self {
        Self::One(url)
    }
}

impl From<Vec<String>> for EntryPoints {
    fn from(urls: Vec<String>) -> Self {
        Self::Many(urls)
    }
}

impl From<Option<Vec<String>>> for EntryPoints {
    fn from(urls: Option<Vec<String>>) -> Self {
        urls.map_or(Self::None, Self::Many)
    }
}

/// Site-specific crawl behavior
#[async_trait]
pub trait Site: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str {
        "site"
    }

    /// Seeds for a new crawl cycle
    ///
    /// `pages` resolves URLs through the content store, so a site can derive
    /// its seeds from an index page.
    async fn entry_points(&self, pages: &mut Pages<'_>) -> crate::Result<EntryPoints>;

    /// Links worth following from `page`
    ///
    /// An error is treated as "no links"; the page is still marked completed.
    fn extract_links(&self, url: &str, page: &[u8]) -> Result<Vec<String>, SiteError>;

    /// Headers and cookies injected into the request for `url`
    fn request_params(&self, _url: &str) -> RequestParams {
        RequestParams::default()
    }

    /// Blob location for a fetch of `url`, relative to the data directory
    fn path_for(&self, url: &str, content_hash: &str) -> String {
        default_blob_name(url, content_hash)
    }
}

/// `sha256(url + content_hash)` in hex, with an `.html` extension
pub fn default_blob_name(url: &str, content_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(content_hash.as_bytes());
    format!("{}.html", hex::encode(hasher.finalize()))
}

/// Page access handed to [`Site::entry_points`]
pub struct Pages<'a> {
    store: &'a mut ContentStore,
    site: &'a dyn Site,
}

impl<'a> Pages<'a> {
    pub(crate) fn new(store: &'a mut ContentStore, site: &'a dyn Site) -> Self {
        Self { store, site }
    }

    /// Resolves `url` through the cache, fetching it if needed
    ///
    /// Unreachable pages come back as the placeholder page.
    pub async fn get(&mut self, url: &str) -> crate::Result<Vec<u8>> {
        let resolved = self.store.resolve(url, self.site).await?;
        Ok(resolved.body)
    }
}
