//! Page retrieval and per-site product extraction.
//!
//! Every fetch goes through the shared [`BrowserResource`]; site scrapers only see it
//! through the narrow [`PageFetcher`] capability and never open connections themselves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod browser;
pub mod dispatcher;
pub mod price;
pub mod sites;

pub use browser::{BrowserResource, ChromeLauncher};
pub use dispatcher::{ScraperDispatcher, SupportedSite};
pub use price::normalize_price;

/// Name and price read from a product page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeResult {
    pub name: String,
    /// `0.0` when the page carried no usable price.
    pub price: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScrapeError {
    #[error("browser session could not be started: {0}")]
    ResourceInit(String),

    #[error("failed to load {url} after {attempts} attempt(s): {reason}")]
    Fetch {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("{site}: product name element not found")]
    ProductNameNotFound { site: &'static str },

    #[error("{site}: price element not found")]
    PriceNotFound { site: &'static str },

    #[error("unsupported site: {url}")]
    UnsupportedSite { url: String },

    #[error("{site}: embedded product data unusable: {reason}")]
    EmbeddedData { site: &'static str, reason: String },
}

impl ScrapeError {
    /// Whether the browser itself is unavailable, so no later check can succeed either.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::ResourceInit(_))
    }

    /// Page was reachable but did not have the expected structure.
    pub fn is_layout_change(&self) -> bool {
        matches!(
            self,
            ScrapeError::ProductNameNotFound { .. }
                | ScrapeError::PriceNotFound { .. }
                | ScrapeError::EmbeddedData { .. }
        )
    }
}

/// Retrieves fully rendered page markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_rendered_html(&self, url: &str) -> Result<String, ScrapeError>;
}

/// A [`PageFetcher`] backed by a long-lived session that must be shut down explicitly.
#[async_trait]
pub trait SessionLifecycle: PageFetcher {
    /// Start the session if it is not running yet.
    async fn acquire(&self) -> Result<(), ScrapeError>;

    /// Terminate the session. Calling it on a released session does nothing.
    async fn release(&self);
}

/// Extraction strategy for one supported site.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    fn site(&self) -> SupportedSite;

    async fn scrape(&self, url: &str) -> Result<ScrapeResult, ScrapeError>;
}
