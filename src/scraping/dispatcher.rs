use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use url::Url;

use super::sites::{AmazonScraper, HepsiburadaScraper};
use super::{PageFetcher, ScrapeError, SiteScraper};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SupportedSite {
    Amazon,
    Hepsiburada,
}

impl SupportedSite {
    /// Short key stored on the product record.
    pub fn key(&self) -> &'static str {
        match self {
            SupportedSite::Amazon => "amazon",
            SupportedSite::Hepsiburada => "hepsiburada",
        }
    }
}

impl fmt::Display for SupportedSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Host substrings, checked in order. New sites are appended, never inserted.
const SITE_PATTERNS: &[(&str, SupportedSite)] = &[
    ("amazon.com.tr", SupportedSite::Amazon),
    ("hepsiburada.com", SupportedSite::Hepsiburada),
];

/// Resolve which supported site a product URL belongs to.
pub fn site_for_url(url: &str) -> Result<SupportedSite, ScrapeError> {
    let unsupported = || ScrapeError::UnsupportedSite { url: url.to_string() };

    let host = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
        .ok_or_else(unsupported)?;

    SITE_PATTERNS
        .iter()
        .find(|(pattern, _)| host.contains(pattern))
        .map(|(_, site)| *site)
        .ok_or_else(unsupported)
}

/// Hands out the scraper for a product URL, all sharing one page fetcher.
#[derive(Clone)]
pub struct ScraperDispatcher {
    fetcher: Arc<dyn PageFetcher>,
}

impl ScraperDispatcher {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn dispatch(&self, url: &str) -> Result<Box<dyn SiteScraper>, ScrapeError> {
        let fetcher = Arc::clone(&self.fetcher);
        let scraper: Box<dyn SiteScraper> = match site_for_url(url)? {
            SupportedSite::Amazon => Box::new(AmazonScraper::new(fetcher)),
            SupportedSite::Hepsiburada => Box::new(HepsiburadaScraper::new(fetcher)),
        };
        Ok(scraper)
    }
}
