// Integration tests for PricePal
// These tests drive the real checker, scrapers and SQLite store against a scripted browser

pub mod batch_tests;
pub mod storage_tests;

use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pricepal::config::{BrowserConfig, CheckerConfig, SmtpConfig};
use pricepal::models::{NewProduct, Product};
use pricepal::notifiers::{AlertNotifier, PriceAlert};
use pricepal::scraping::browser::{BrowserLauncher, BrowserSession};
use pricepal::scraping::BrowserResource;
use pricepal::storage::{keys, AppSettings, SqliteStore};
use pricepal::PriceChecker;

pub const AMAZON_URL: &str = "https://www.amazon.com.tr/dp/B0TEST0001";
pub const AMAZON_URL_2: &str = "https://www.amazon.com.tr/dp/B0TEST0002";
pub const HEPSIBURADA_URL: &str = "https://www.hepsiburada.com/robot-supurge-p-HBC0001";

/// What one navigation to a URL yields.
pub type PageResult = Result<String, String>;

#[derive(Debug, Default)]
pub struct BrowserCounters {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub navigations: Mutex<HashMap<String, usize>>,
}

impl BrowserCounters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn navigations(&self, url: &str) -> usize {
        self.navigations.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

/// Each URL replays its script one navigation at a time; the last entry repeats.
type Scripts = Arc<Mutex<HashMap<String, VecDeque<PageResult>>>>;

pub struct ScriptedLauncher {
    scripts: Scripts,
    counters: Arc<BrowserCounters>,
    fail_launch: bool,
}

impl BrowserLauncher for ScriptedLauncher {
    type Session = ScriptedSession;

    fn launch(&self, _config: &BrowserConfig) -> anyhow::Result<ScriptedSession> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(anyhow!("Could not auto detect a chrome executable"));
        }
        Ok(ScriptedSession {
            scripts: Arc::clone(&self.scripts),
            counters: Arc::clone(&self.counters),
            loaded: Mutex::new(None),
        })
    }
}

pub struct ScriptedSession {
    scripts: Scripts,
    counters: Arc<BrowserCounters>,
    loaded: Mutex<Option<String>>,
}

impl BrowserSession for ScriptedSession {
    fn navigate(&self, url: &str) -> anyhow::Result<()> {
        *self
            .counters
            .navigations
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts
            .get_mut(url)
            .ok_or_else(|| anyhow!("net::ERR_NAME_NOT_RESOLVED"))?;
        let step = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };

        match step {
            Some(Ok(html)) => {
                *self.loaded.lock().unwrap() = Some(html);
                Ok(())
            }
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => Err(anyhow!("net::ERR_EMPTY_RESPONSE")),
        }
    }

    fn content(&self) -> anyhow::Result<String> {
        self.loaded
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("no page loaded"))
    }

    fn is_alive(&self) -> bool {
        true
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records every alert and reports the configured delivery result.
#[derive(Debug)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<PriceAlert>>,
    deliver: AtomicBool,
}

impl RecordingNotifier {
    pub fn new(deliver: bool) -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            deliver: AtomicBool::new(deliver),
        }
    }

    pub fn set_deliver(&self, deliver: bool) {
        self.deliver.store(deliver, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<PriceAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn send_price_alert(&self, alert: &PriceAlert) -> bool {
        self.alerts.lock().unwrap().push(alert.clone());
        self.deliver.load(Ordering::SeqCst)
    }
}

/// Browser settings with every wait removed.
pub fn get_test_browser_config() -> BrowserConfig {
    BrowserConfig {
        chrome_path: None,
        user_agent: "PricePal-Test/1.0".to_string(),
        page_load_timeout_secs: 5,
        settle_delay_ms: 0,
        fetch_attempts: 2,
        retry_delay_ms: 0,
        idle_timeout_secs: 60,
    }
}

pub fn amazon_page(name: &str, price: &str) -> PageResult {
    Ok(format!(
        r#"<html><body>
            <span id="productTitle">{}</span>
            <span class="a-price"><span class="a-offscreen">{}</span></span>
        </body></html>"#,
        name, price
    ))
}

pub fn hepsiburada_page(name: &str, price: f64) -> PageResult {
    Ok(format!(
        r#"<html><head><script>
            window.__PRODUCT_DETAIL_APP_INITIAL_STATE__ = {{"product":{{"name":"{}","prices":[{{"value":{}}}]}}}};
        </script></head><body></body></html>"#,
        name, price
    ))
}

pub struct TestApp {
    pub checker: PriceChecker,
    pub store: SqliteStore,
    pub browser: Arc<BrowserResource<ScriptedLauncher>>,
    pub counters: Arc<BrowserCounters>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub async fn add(&self, url: &str, target_price: f64) -> anyhow::Result<Product> {
        Ok(self
            .store
            .add_product(NewProduct {
                url: url.to_string(),
                target_price,
            })
            .await?)
    }

    pub async fn reload(&self, product: &Product) -> anyhow::Result<Product> {
        use pricepal::storage::ProductStore;
        self.store
            .get_product_by_id(product.id)
            .await?
            .ok_or_else(|| anyhow!("product {} disappeared", product.id))
    }
}

pub async fn create_test_app(pages: Vec<(&str, Vec<PageResult>)>) -> anyhow::Result<TestApp> {
    build_test_app(pages, false).await
}

pub async fn create_test_app_without_browser() -> anyhow::Result<TestApp> {
    build_test_app(Vec::new(), true).await
}

async fn build_test_app(pages: Vec<(&str, Vec<PageResult>)>, fail_launch: bool) -> anyhow::Result<TestApp> {
    let scripts: HashMap<String, VecDeque<PageResult>> = pages
        .into_iter()
        .map(|(url, script)| (url.to_string(), script.into()))
        .collect();
    let counters = Arc::new(BrowserCounters::default());
    let launcher = ScriptedLauncher {
        scripts: Arc::new(Mutex::new(scripts)),
        counters: Arc::clone(&counters),
        fail_launch,
    };
    let browser = Arc::new(BrowserResource::with_launcher(launcher, get_test_browser_config()));

    let store = SqliteStore::in_memory().await?;
    store.set_setting(keys::USER_EMAIL, "alerts@example.com").await?;
    let settings = AppSettings::new(store.clone(), Some("app-password".to_string()));
    let notifier = Arc::new(RecordingNotifier::new(true));

    let checker = PriceChecker::new(
        Arc::clone(&browser),
        Arc::new(store.clone()),
        Arc::new(settings),
        notifier.clone(),
        CheckerConfig { product_delay_ms: 0 },
        SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            password: None,
        },
    );

    Ok(TestApp {
        checker,
        store,
        browser,
        counters,
        notifier,
    })
}
