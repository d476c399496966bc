//! In-process stand-ins for the network and for a site, used by unit tests

use crate::crawler::content_store::ContentStore;
use crate::crawler::fetcher::{FetchResult, PageFetcher, RequestParams};
use crate::crawler::rate_limit::RateLimiter;
use crate::crawler::site::{default_blob_name, EntryPoints, Pages, Site};
use crate::storage::SqlitePageIndex;
use crate::SiteError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct StubWebState {
    pages: HashMap<String, Vec<u8>>,
    calls: Vec<(String, RequestParams)>,
}

/// A fake web: URLs it serves answer 200, everything else 404
#[derive(Clone, Default)]
pub(crate) struct StubWeb {
    state: Arc<Mutex<StubWebState>>,
}

impl StubWeb {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), body.into());
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(called, _)| called == url)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub(crate) fn last_params(&self, url: &str) -> Option<RequestParams> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .rev()
            .find(|(called, _)| called == url)
            .map(|(_, params)| params.clone())
    }

    pub(crate) fn fetcher(&self) -> Box<dyn PageFetcher> {
        Box::new(StubFetcher { web: self.clone() })
    }
}

struct StubFetcher {
    web: StubWeb,
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str, params: &RequestParams) -> FetchResult {
        let mut state = self.web.state.lock().unwrap();
        state.calls.push((url.to_string(), params.clone()));
        match state.pages.get(url) {
            Some(body) => FetchResult::Success {
                final_url: url.to_string(),
                body: body.clone(),
            },
            None => FetchResult::HttpError { status_code: 404 },
        }
    }
}

/// Content store over `dir/cache.db` and `dir/data`, with no throttling
pub(crate) fn stub_store(dir: &Path, web: &StubWeb) -> ContentStore {
    let data_dir = dir.join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    let index = SqlitePageIndex::new(&dir.join("cache.db")).unwrap();
    ContentStore::new(index, data_dir, web.fetcher(), RateLimiter::new(Duration::ZERO))
}

/// A site whose links are a fixed table
pub(crate) struct StubSite {
    entry_points: EntryPoints,
    links: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    params: RequestParams,
    layout: Option<String>,
    seed_calls: Arc<AtomicUsize>,
}

impl StubSite {
    pub(crate) fn new(entry_points: EntryPoints) -> Self {
        Self {
            entry_points,
            links: HashMap::new(),
            failing: HashSet::new(),
            params: RequestParams::default(),
            layout: None,
            seed_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of `entry_points` calls, shared with the site
    pub(crate) fn seed_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.seed_calls)
    }

    pub(crate) fn link(mut self, from: &str, to: &[&str]) -> Self {
        self.links
            .insert(from.to_string(), to.iter().map(|s| s.to_string()).collect());
        self
    }

    /// `extract_links` fails for `url`
    pub(crate) fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub(crate) fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.params = self.params.with_cookie(name, value);
        self
    }

    /// Blobs go under `prefix/`
    pub(crate) fn with_layout(mut self, prefix: &str) -> Self {
        self.layout = Some(prefix.to_string());
        self
    }
}

#[async_trait]
impl Site for StubSite {
    fn name(&self) -> &str {
        "stub"
    }

    async fn entry_points(&self, _pages: &mut Pages<'_>) -> crate::Result<EntryPoints> {
        self.seed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entry_points.clone())
    }

    fn extract_links(&self, url: &str, _page: &[u8]) -> Result<Vec<String>, SiteError> {
        if self.failing.contains(url) {
            return Err(SiteError::HtmlParse {
                url: url.to_string(),
                message: "stub failure".to_string(),
            });
        }
        Ok(self.links.get(url).cloned().unwrap_or_default())
    }

    fn request_params(&self, _url: &str) -> RequestParams {
        self.params.clone()
    }

    fn path_for(&self, url: &str, content_hash: &str) -> String {
        let name = default_blob_name(url, content_hash);
        match &self.layout {
            Some(prefix) => format!("{}/{}", prefix, name),
            None => name,
        }
    }
}
