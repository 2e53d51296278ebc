use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};

use super::first_text;
use crate::scraping::{normalize_price, PageFetcher, ScrapeError, ScrapeResult, SiteScraper, SupportedSite};

const SITE: &str = "amazon";

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span#productTitle").unwrap());
static PRICE_WHOLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.a-price-whole").unwrap());
static PRICE_FRACTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.a-price-fraction").unwrap());
// Deal and variant pages only render the screen-reader price
static PRICE_OFFSCREEN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.a-offscreen").unwrap());

/// Amazon Türkiye product pages, read from DOM elements.
pub struct AmazonScraper {
    fetcher: Arc<dyn PageFetcher>,
}

impl AmazonScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl SiteScraper for AmazonScraper {
    fn site(&self) -> SupportedSite {
        SupportedSite::Amazon
    }

    async fn scrape(&self, url: &str) -> Result<ScrapeResult, ScrapeError> {
        let html = self.fetcher.fetch_rendered_html(url).await?;
        parse_product_page(&html)
    }
}

pub fn parse_product_page(html: &str) -> Result<ScrapeResult, ScrapeError> {
    let document = Html::parse_document(html);

    let name = first_text(&document, &TITLE)
        .ok_or(ScrapeError::ProductNameNotFound { site: SITE })?;

    let price_text = match (
        first_text(&document, &PRICE_WHOLE),
        first_text(&document, &PRICE_FRACTION),
    ) {
        (Some(whole), Some(fraction)) => format!("{}{}", whole, fraction),
        _ => first_text(&document, &PRICE_OFFSCREEN)
            .ok_or(ScrapeError::PriceNotFound { site: SITE })?,
    };

    Ok(ScrapeResult {
        name,
        price: normalize_price(&price_text),
    })
}
