use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::{Arc, LazyLock};

use crate::scraping::{normalize_price, PageFetcher, ScrapeError, ScrapeResult, SiteScraper, SupportedSite};

const SITE: &str = "hepsiburada";

/// Global the product page hydrates from: `window.<KEY> = { ... };`
pub const DATA_STORE_KEY: &str = "__PRODUCT_DETAIL_APP_INITIAL_STATE__";
pub const NAME_PATH: &str = "/product/name";
pub const PRICE_PATH: &str = "/product/prices/0/value";

static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

/// Hepsiburada product pages, read from the embedded state object instead of markup.
pub struct HepsiburadaScraper {
    fetcher: Arc<dyn PageFetcher>,
}

impl HepsiburadaScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl SiteScraper for HepsiburadaScraper {
    fn site(&self) -> SupportedSite {
        SupportedSite::Hepsiburada
    }

    async fn scrape(&self, url: &str) -> Result<ScrapeResult, ScrapeError> {
        let html = self.fetcher.fetch_rendered_html(url).await?;
        parse_product_page(&html)
    }
}

fn structural(reason: impl Into<String>) -> ScrapeError {
    ScrapeError::EmbeddedData {
        site: SITE,
        reason: reason.into(),
    }
}

pub fn parse_product_page(html: &str) -> Result<ScrapeResult, ScrapeError> {
    let state = {
        let document = Html::parse_document(html);
        let script = document
            .select(&SCRIPT)
            .map(|element| element.text().collect::<String>())
            .find(|text| text.contains(DATA_STORE_KEY))
            .ok_or_else(|| structural(format!("no script block defines {}", DATA_STORE_KEY)))?;
        extract_state(&script)?
    };

    let name = state
        .pointer(NAME_PATH)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| structural(format!("missing string at {}", NAME_PATH)))?;

    let price = match state.pointer(PRICE_PATH) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => normalize_price(text),
        _ => return Err(structural(format!("missing price at {}", PRICE_PATH))),
    };

    Ok(ScrapeResult {
        name: name.to_string(),
        price,
    })
}

// Parses the first JSON object after the key; trailing script is ignored.
fn extract_state(script: &str) -> Result<Value, ScrapeError> {
    let key_end = script
        .find(DATA_STORE_KEY)
        .map(|at| at + DATA_STORE_KEY.len())
        .ok_or_else(|| structural("data store key vanished"))?;
    let assigned = &script[key_end..];
    let start = assigned
        .find('{')
        .ok_or_else(|| structural("data store is not assigned an object"))?;

    match serde_json::Deserializer::from_str(&assigned[start..])
        .into_iter::<Value>()
        .next()
    {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(structural(format!("data store is not valid JSON: {}", e))),
        None => Err(structural("data store is empty")),
    }
}
