//! Check cycle: scrape a product page, compare against the target, persist, alert.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::config::{CheckerConfig, SmtpConfig};
use crate::models::{Product, ProductStatus, ProductUpdate};
use crate::notifiers::{AlertNotifier, PriceAlert};
use crate::scraping::{PageFetcher, ScrapeError, ScrapeResult, ScraperDispatcher, SessionLifecycle};
use crate::storage::{ProductStore, SettingsStore};
use crate::{AppError, Result};

/// What one check decided for a product.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub product_id: i64,
    pub status: ProductStatus,
    /// Positive price observed by this check, if any.
    pub price: Option<f64>,
    pub notified: bool,
    pub error: Option<ScrapeError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub checked: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub alerts: usize,
    /// Set when the browser could not be started and remaining products were skipped.
    pub aborted: bool,
    /// Set when a stop was requested and remaining products were skipped.
    pub interrupted: bool,
}

pub struct PriceChecker {
    dispatcher: ScraperDispatcher,
    browser: Arc<dyn SessionLifecycle>,
    store: Arc<dyn ProductStore>,
    settings: Arc<dyn SettingsStore>,
    notifier: Arc<dyn AlertNotifier>,
    config: CheckerConfig,
    smtp: SmtpConfig,
    batch_lock: Mutex<()>,
    stop: watch::Sender<bool>,
}

impl PriceChecker {
    pub fn new<B>(
        browser: Arc<B>,
        store: Arc<dyn ProductStore>,
        settings: Arc<dyn SettingsStore>,
        notifier: Arc<dyn AlertNotifier>,
        config: CheckerConfig,
        smtp: SmtpConfig,
    ) -> Self
    where
        B: SessionLifecycle + 'static,
    {
        let fetcher: Arc<dyn PageFetcher> = browser.clone();
        Self {
            dispatcher: ScraperDispatcher::new(fetcher),
            browser,
            store,
            settings,
            notifier,
            config,
            smtp,
            batch_lock: Mutex::new(()),
            stop: watch::channel(false).0,
        }
    }

    /// Ask a running batch to stop before its next product.
    ///
    /// The product being checked is finished and persisted first. Dropping the
    /// batch future instead can leave a product with history written but no update.
    pub fn request_stop(&self) {
        self.stop.send_replace(true);
    }

    /// Run one full check cycle and persist the result.
    ///
    /// Scrape failures end up as an `ERROR` status on the product, not as an `Err`;
    /// only storage failures are returned. The browser is left running.
    pub async fn check_single_product(&self, product: &Product) -> Result<CheckOutcome> {
        info!(product_id = product.id, site = %product.site, "Checking {}", product.url);

        let mut update = ProductUpdate {
            last_check_date: Some(Utc::now()),
            ..Default::default()
        };
        let mut outcome = CheckOutcome {
            product_id: product.id,
            status: ProductStatus::Error,
            price: None,
            notified: false,
            error: None,
        };

        match self.scrape(&product.url).await {
            Ok(result) => {
                self.apply_scrape(product, &result, &mut update, &mut outcome).await;
            }
            Err(e) => {
                warn!(
                    product_id = product.id,
                    layout_change = e.is_layout_change(),
                    fatal = e.is_fatal(),
                    "Check failed: {}",
                    e
                );
                update.status = Some(ProductStatus::Error);
                outcome.error = Some(e);
            }
        }

        self.store.update_product(product.id, &update).await?;
        if let Some(status) = update.status {
            outcome.status = status;
        }
        Ok(outcome)
    }

    async fn scrape(&self, url: &str) -> std::result::Result<ScrapeResult, ScrapeError> {
        let scraper = self.dispatcher.dispatch(url)?;
        scraper.scrape(url).await
    }

    async fn apply_scrape(
        &self,
        product: &Product,
        result: &ScrapeResult,
        update: &mut ProductUpdate,
        outcome: &mut CheckOutcome,
    ) {
        let price = result.price;

        // Zero means the page had no usable price; keep the last known one
        if price > 0.0 {
            if let Err(e) = self.store.add_price_history(product.id, price).await {
                warn!(product_id = product.id, "Could not record price history: {}", e);
            }
            update.current_price = Some(price);
            outcome.price = Some(price);
        }

        if product.name.as_deref() != Some(result.name.as_str()) {
            update.name = Some(result.name.clone());
        }

        if price > 0.0 && price <= product.target_price {
            info!(product_id = product.id, price, target = product.target_price, "Price reached target");
            update.status = Some(ProductStatus::PriceAlert);

            if self.notify(product, result).await {
                update.is_active = Some(false);
                outcome.notified = true;
            } else {
                warn!(product_id = product.id, "Alert not delivered; will retry on the next check");
            }
        } else {
            info!(product_id = product.id, price, target = product.target_price, "Price still above target");
            update.status = Some(ProductStatus::Tracking);
        }
    }

    async fn notify(&self, product: &Product, result: &ScrapeResult) -> bool {
        match self.build_alert(product, result).await {
            Ok(alert) => self.notifier.send_price_alert(&alert).await,
            Err(e) => {
                warn!(product_id = product.id, "Could not read notification settings: {}", e);
                false
            }
        }
    }

    async fn build_alert(&self, product: &Product, result: &ScrapeResult) -> Result<PriceAlert> {
        PriceAlert::from_settings(self.settings.as_ref(), &self.smtp, &result.name, result.price, &product.url).await
    }

    /// Check every active product in order, then shut the browser down.
    ///
    /// Returns [`AppError::BatchInProgress`] if another batch is running on this checker.
    pub async fn run_all_active_product_checks(&self) -> Result<BatchSummary> {
        let _guard = self.batch_lock.try_lock().map_err(|_| AppError::BatchInProgress)?;

        let result = self.run_batch().await;
        self.browser.release().await;
        self.stop.send_replace(false);

        match &result {
            Ok(summary) => info!(
                checked = summary.checked,
                succeeded = summary.succeeded,
                failed = summary.failed,
                alerts = summary.alerts,
                aborted = summary.aborted,
                interrupted = summary.interrupted,
                "Batch finished, browser released"
            ),
            Err(e) => error!("Batch failed: {}", e),
        }
        result
    }

    async fn run_batch(&self) -> Result<BatchSummary> {
        let products = self.store.get_active_products().await?;
        let mut summary = BatchSummary::default();

        if products.is_empty() {
            info!("No active products to check");
            return Ok(summary);
        }
        info!("Checking {} active product(s)", products.len());

        let delay = self.config.product_delay();
        let mut stop = self.stop.subscribe();
        for (i, product) in products.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stop.wait_for(|stopped| *stopped) => {}
                }
            }
            if *stop.borrow() {
                warn!("Stop requested; skipping {} remaining product(s)", products.len() - i);
                summary.interrupted = true;
                break;
            }

            summary.checked += 1;
            match self.check_single_product(product).await {
                Ok(outcome) => {
                    match outcome.status {
                        ProductStatus::Error => summary.failed += 1,
                        ProductStatus::PriceAlert => {
                            summary.succeeded += 1;
                            summary.alerts += 1;
                        }
                        _ => summary.succeeded += 1,
                    }
                    if outcome.error.as_ref().is_some_and(ScrapeError::is_fatal) {
                        error!("Browser unavailable; skipping {} remaining product(s)", products.len() - i - 1);
                        summary.aborted = true;
                        break;
                    }
                }
                Err(e) => {
                    error!(product_id = product.id, "Could not save check result: {}", e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}
