//! HTML helpers shared by the site implementations
//!
//! Pages are decoded as UTF-8, parsed with `scraper`, and `href` values are
//! resolved against the page URL. Link resolution drops:
//! - `javascript:`, `mailto:`, `tel:` links
//! - Data URIs
//! - Fragment-only links (same page anchors)
//! - Anything that is not HTTP(S) after resolution
//!
//! Fragments are stripped from the links that remain, so `/a#top` and `/a`
//! end up as the same queue entry.

use crate::SiteError;
use scraper::{Html, Selector};
use url::Url;

/// Decodes a page body, failing on invalid UTF-8
pub fn decode<'a>(url: &str, page: &'a [u8]) -> Result<&'a str, SiteError> {
    std::str::from_utf8(page).map_err(|_| SiteError::Encoding {
        url: url.to_string(),
    })
}

/// Parses the URL a page was fetched from, for resolving relative links
pub fn page_url(url: &str) -> Result<Url, SiteError> {
    Url::parse(url).map_err(|e| SiteError::HtmlParse {
        url: url.to_string(),
        message: format!("invalid page URL: {}", e),
    })
}

/// Compiles a CSS selector
pub fn selector(url: &str, css: &str) -> Result<Selector, SiteError> {
    Selector::parse(css).map_err(|e| SiteError::HtmlParse {
        url: url.to_string(),
        message: format!("bad selector {:?}: {:?}", css, e),
    })
}

/// `href` values of every element matching `css`, in document order
///
/// Elements carrying a `download` attribute are skipped.
pub fn select_hrefs<'a>(
    url: &str,
    document: &'a Html,
    css: &str,
) -> Result<Vec<&'a str>, SiteError> {
    let selector = selector(url, css)?;

    Ok(document
        .select(&selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .collect())
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);

    Some(absolute_url)
}

/// Keeps the first occurrence of each link
pub fn dedup_links(links: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
