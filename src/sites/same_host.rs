//! A generic site: start from configured seeds and stay on their host
//!
//! Every `<a href>` and canonical link that resolves to the host of the page
//! it appears on is followed; `rel="nofollow"` links are followed too.

use crate::crawler::{EntryPoints, Pages, Site};
use crate::sites::html;
use crate::{ConfigError, SiteError};
use async_trait::async_trait;
use scraper::Html;
use url::Url;

const ANCHOR_SELECTOR: &str = "a[href]";
const CANONICAL_SELECTOR: &str = "link[rel='canonical'][href]";

pub struct SameHostSite {
    seeds: Vec<Url>,
}

impl SameHostSite {
    pub fn new<S: AsRef<str>>(seeds: &[S]) -> Result<Self, ConfigError> {
        let seeds = seeds
            .iter()
            .map(|seed| {
                let seed = seed.as_ref();
                Url::parse(seed).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", seed, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { seeds })
    }
}

#[async_trait]
impl Site for SameHostSite {
    fn name(&self) -> &str {
        "same-host"
    }

    async fn entry_points(&self, _pages: &mut Pages<'_>) -> crate::Result<EntryPoints> {
        let seeds = self.seeds.iter().map(|seed| seed.to_string()).collect();
        Ok(EntryPoints::Many(html::dedup_links(seeds)))
    }

    fn extract_links(&self, url: &str, page: &[u8]) -> Result<Vec<String>, SiteError> {
        let base = html::page_url(url)?;
        let document = Html::parse_document(html::decode(url, page)?);

        let mut links = Vec::new();
        for css in [ANCHOR_SELECTOR, CANONICAL_SELECTOR] {
            links.extend(
                html::select_hrefs(url, &document, css)?
                    .into_iter()
                    .filter_map(|href| html::resolve_link(href, &base))
                    .filter(|link| link.host_str() == base.host_str())
                    .map(|link| link.to_string()),
            );
        }

        Ok(html::dedup_links(links))
    }
}
