use super::*;
use pricepal::config::DatabaseConfig;
use pricepal::models::{ProductStatus, ProductUpdate};
use pricepal::scraping::ScrapeError;
use pricepal::storage::{ProductStore, SettingsStore};
use pricepal::AppError;

#[tokio::test]
async fn test_product_management_lifecycle() -> anyhow::Result<()> {
    let store = SqliteStore::in_memory().await?;

    let first = store
        .add_product(NewProduct {
            url: AMAZON_URL.to_string(),
            target_price: 750.0,
        })
        .await?;
    let second = store
        .add_product(NewProduct {
            url: HEPSIBURADA_URL.to_string(),
            target_price: 4000.0,
        })
        .await?;
    assert_eq!(first.site, "amazon");
    assert_eq!(second.site, "hepsiburada");

    // Newest first
    let listed: Vec<i64> = store.list_products().await?.iter().map(|p| p.id).collect();
    assert_eq!(listed, vec![second.id, first.id]);

    store
        .update_product(first.id, &ProductUpdate {
            status: Some(ProductStatus::Tracking),
            current_price: Some(800.0),
            ..Default::default()
        })
        .await?;
    store.add_price_history(first.id, 800.0).await?;

    store.delete_product(first.id).await?;
    assert!(store.get_product_by_id(first.id).await?.is_none());
    assert!(store.price_history(first.id).await?.is_empty());
    assert_eq!(store.list_products().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_add_product_rejections() -> anyhow::Result<()> {
    let store = SqliteStore::in_memory().await?;

    let unsupported = store
        .add_product(NewProduct {
            url: "https://www.n11.com/urun/kulaklik-123".to_string(),
            target_price: 100.0,
        })
        .await;
    assert!(matches!(unsupported, Err(AppError::Scrape(ScrapeError::UnsupportedSite { .. }))));

    let not_a_url = store
        .add_product(NewProduct {
            url: "kulaklik".to_string(),
            target_price: 100.0,
        })
        .await;
    assert!(matches!(not_a_url, Err(AppError::Validation(_))));

    let zero_target = store
        .add_product(NewProduct {
            url: AMAZON_URL.to_string(),
            target_price: 0.0,
        })
        .await;
    assert!(matches!(zero_target, Err(AppError::Validation(_))));

    assert!(store.list_products().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_connect_runs_migrations() -> anyhow::Result<()> {
    let store = SqliteStore::connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await?;

    assert!(store.get_active_products().await?.is_empty());
    assert_eq!(store.get_setting(keys::USER_EMAIL).await?, None);

    Ok(())
}

#[tokio::test]
async fn test_app_settings_read_through_store() -> anyhow::Result<()> {
    let store = SqliteStore::in_memory().await?;
    let settings = AppSettings::new(store.clone(), Some("app-password".to_string()));

    assert_eq!(settings.get(keys::SMTP_PORT, "587").await?, "587");
    store.set_setting(keys::SMTP_PORT, "465").await?;
    assert_eq!(settings.get(keys::SMTP_PORT, "587").await?, "465");
    assert_eq!(settings.get_email_password().await?.as_deref(), Some("app-password"));

    let without_password = AppSettings::new(store, None);
    assert_eq!(without_password.get_email_password().await?, None);

    Ok(())
}
