use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pricepal::config::LoggingConfig;
use pricepal::models::NewProduct;
use pricepal::notifiers::email::format_price;
use pricepal::notifiers::{send_test_email, EmailNotifier};
use pricepal::scraping::{BrowserResource, SessionLifecycle};
use pricepal::storage::{AppSettings, ProductStore, SqliteStore};
use pricepal::{AppConfig, PriceChecker};

mod cli;

use cli::{Cli, Commands, SettingKey};

fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "pricepal.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}

fn build_checker(config: &AppConfig, store: SqliteStore) -> (PriceChecker, Arc<BrowserResource>) {
    let browser = Arc::new(BrowserResource::new(config.browser.clone()));
    let settings = AppSettings::new(store.clone(), config.notifications.smtp.password.clone());
    let checker = PriceChecker::new(
        browser.clone(),
        Arc::new(store),
        Arc::new(settings),
        Arc::new(EmailNotifier::new()),
        config.checker.clone(),
        config.notifications.smtp.clone(),
    );
    (checker, browser)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_dir(&cli.config_dir).context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    let store = SqliteStore::connect(&config.database).await?;

    match cli.command {
        Commands::Add { url, target_price } => {
            let product = store.add_product(NewProduct { url, target_price }).await?;
            println!("Added product {} ({}) with target {} TL", product.id, product.site, format_price(product.target_price));
        }
        Commands::List => {
            let products = store.list_products().await?;
            if products.is_empty() {
                println!("No products tracked yet");
            }
            for product in products {
                let current = product
                    .current_price
                    .map(format_price)
                    .unwrap_or_else(|| "-".to_string());
                let checked = product
                    .last_check_date
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{:>4}  {:<11}  {:>12}  {:>12}  {}{}  {}",
                    product.id,
                    product.status,
                    current,
                    format_price(product.target_price),
                    checked,
                    if product.is_active { "" } else { " (inactive)" },
                    product.display_name()
                );
            }
        }
        Commands::Edit { id, target_price, url } => {
            if target_price.is_none() && url.is_none() {
                return Err(anyhow!("Nothing to change; pass --target-price and/or --url"));
            }
            let product = store.update_target(id, url.as_deref(), target_price).await?;
            println!(
                "Product {} ({}) now targets {} TL: {}",
                product.id,
                product.site,
                format_price(product.target_price),
                product.url
            );
        }
        Commands::Remove { id } => {
            store.delete_product(id).await?;
            println!("Removed product {}", id);
        }
        Commands::History { id } => {
            for entry in store.price_history(id).await? {
                println!("{}  {:>12} TL", entry.observed_at.format("%Y-%m-%d %H:%M:%S"), format_price(entry.price));
            }
        }
        Commands::Set { key, value } => {
            if key == SettingKey::SmtpPort {
                value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("smtp_port must be a port number, got '{}'", value))?;
            }
            store.set_setting(key.key(), &value).await?;
            println!("{} saved", key.key());
        }
        Commands::TestEmail => {
            let settings = AppSettings::new(store, config.notifications.smtp.password.clone());
            if send_test_email(&EmailNotifier::new(), &settings, &config.notifications.smtp).await? {
                println!("Test email sent, check your inbox");
            } else {
                return Err(anyhow!("Test email could not be sent; check the SMTP settings and password"));
            }
        }
        Commands::Check { id } => {
            let product = store
                .get_product_by_id(id)
                .await?
                .ok_or_else(|| anyhow!("No product with id {}", id))?;
            let (checker, browser) = build_checker(&config, store);

            let result = checker.check_single_product(&product).await;
            browser.release().await;

            let outcome = result?;
            match &outcome.error {
                Some(e) => println!("Product {}: {} ({})", id, outcome.status, e),
                None => println!(
                    "Product {}: {} at {} TL{}",
                    id,
                    outcome.status,
                    outcome.price.map(format_price).unwrap_or_else(|| "-".to_string()),
                    if outcome.notified { ", alert sent" } else { "" }
                ),
            }
        }
        Commands::CheckAll => {
            let (checker, browser) = build_checker(&config, store);

            let batch = checker.run_all_active_product_checks();
            tokio::pin!(batch);
            let result = tokio::select! {
                result = &mut batch => result,
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, finishing the current product before stopping");
                    checker.request_stop();
                    batch.await
                }
            };
            // Normally a no-op: the batch releases before returning
            browser.release().await;

            let summary = result?;
            println!(
                "Checked {}: {} ok, {} failed, {} alert(s){}{}",
                summary.checked,
                summary.succeeded,
                summary.failed,
                summary.alerts,
                if summary.aborted { ", aborted" } else { "" },
                if summary.interrupted { ", interrupted" } else { "" }
            );
        }
    }

    info!("Done");
    Ok(())
}
