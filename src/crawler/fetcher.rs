//! HTTP fetcher implementation
//!
//! This module handles all network I/O for the crawler:
//! - Building the HTTP client with a proper user agent string
//! - Injecting per-request headers and cookies supplied by the site
//! - Classifying responses into success and transient failures
//!
//! Anything other than HTTP 200 is a transient failure; the content store
//! turns those into a placeholder page instead of an error.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Per-request parameters supplied by a site (auth, consent cookies, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Value of the `Cookie` header, if any cookies are set
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered 200 with a body
    Success {
        /// Final URL after redirects
        final_url: String,
        /// Page body, unmodified
        body: Vec<u8>,
    },

    /// The server answered with any status other than 200
    HttpError { status_code: u16 },

    /// No usable response (connection refused, timeout, body read failure)
    NetworkError { error: String, timed_out: bool },
}

/// The network primitive used by the content store
///
/// Implementations must not retry; one call is one request.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, params: &RequestParams) -> FetchResult;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use cache_crawler::config::load_config;
/// use cache_crawler::crawler::build_http_client;
/// use std::path::Path;
///
/// let config = load_config(Path::new("crawler.toml")).unwrap();
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(config.crawler.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, params: &RequestParams) -> FetchResult {
        let mut request = self.client.get(url);
        for (name, value) in &params.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(cookies) = params.cookie_header() {
            request = request.header(header::COOKIE, cookies);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return FetchResult::NetworkError {
                    error: e.to_string(),
                    timed_out: e.is_timeout(),
                }
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let final_url = response.url().to_string();
        match response.bytes().await {
            Ok(body) => FetchResult::Success {
                final_url,
                body: body.to_vec(),
            },
            Err(e) => FetchResult::NetworkError {
                error: e.to_string(),
                timed_out: e.is_timeout(),
            },
        }
    }
}
