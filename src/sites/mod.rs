//! Concrete sites
//!
//! Each site implements [`crate::crawler::Site`]; [`build_site`] picks one
//! from the `[site]` section of the configuration.

pub mod html;
mod ptt;
mod same_host;

pub use ptt::PttSite;
pub use same_host::SameHostSite;

use crate::config::SiteConfig;
use crate::crawler::Site;
use crate::ConfigError;

/// Builds the site described by `config`
///
/// # Returns
///
/// * `Ok(Box<dyn Site>)` - The configured site
/// * `Err(ConfigError)` - A base URL or seed does not parse
pub fn build_site(config: &SiteConfig) -> Result<Box<dyn Site>, ConfigError> {
    let site: Box<dyn Site> = match config {
        SiteConfig::Ptt { base_url } => Box::new(PttSite::new(base_url)?),
        SiteConfig::SameHost { seeds } => Box::new(SameHostSite::new(seeds)?),
    };

    tracing::debug!("Using site {}", site.name());
    Ok(site)
}
