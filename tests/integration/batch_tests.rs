use super::*;
use pricepal::models::ProductStatus;
use pricepal::storage::ProductStore;
use pricepal::AppError;

#[tokio::test]
async fn test_batch_uses_one_browser_session() -> anyhow::Result<()> {
    let app = create_test_app(vec![
        (AMAZON_URL, vec![amazon_page("Kulaklık", "1.300 TL")]),
        (AMAZON_URL_2, vec![Ok("<html><body>Robot check</body></html>".to_string())]),
        (HEPSIBURADA_URL, vec![hepsiburada_page("Robot Süpürge", 4999.0)]),
    ])
    .await?;
    app.add(AMAZON_URL, 1000.0).await?;
    let blocked = app.add(AMAZON_URL_2, 1000.0).await?;
    app.add(HEPSIBURADA_URL, 5000.0).await?;

    let summary = app.checker.run_all_active_product_checks().await?;

    assert_eq!(summary.checked, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.alerts, 1);
    assert!(!summary.aborted);
    assert_eq!(app.reload(&blocked).await?.status, ProductStatus::Error);

    assert_eq!(app.counters.launches(), 1);
    assert_eq!(app.counters.closes(), 1);
    assert!(!app.browser.is_running().await);

    Ok(())
}

#[tokio::test]
async fn test_browser_launch_failure_aborts_batch() -> anyhow::Result<()> {
    let app = create_test_app_without_browser().await?;
    let first = app.add(AMAZON_URL, 1000.0).await?;
    let second = app.add(AMAZON_URL_2, 1000.0).await?;
    let third = app.add(HEPSIBURADA_URL, 1000.0).await?;

    let summary = app.checker.run_all_active_product_checks().await?;

    assert!(summary.aborted);
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(app.reload(&first).await?.status, ProductStatus::Error);
    assert_eq!(app.reload(&second).await?.status, ProductStatus::Pending);
    assert_eq!(app.reload(&third).await?.status, ProductStatus::Pending);
    assert!(app.reload(&second).await?.last_check_date.is_none());

    assert_eq!(app.counters.launches(), 1);
    assert_eq!(app.counters.closes(), 0);

    Ok(())
}

#[tokio::test]
async fn test_empty_batch_never_starts_browser() -> anyhow::Result<()> {
    let app = create_test_app(Vec::new()).await?;

    let summary = app.checker.run_all_active_product_checks().await?;

    assert_eq!(summary.checked, 0);
    assert_eq!(app.counters.launches(), 0);
    assert_eq!(app.counters.closes(), 0);

    Ok(())
}

#[tokio::test]
async fn test_inactive_products_are_skipped() -> anyhow::Result<()> {
    let app = create_test_app(vec![
        (AMAZON_URL, vec![amazon_page("Kulaklık", "800 TL")]),
        (AMAZON_URL_2, vec![amazon_page("Hoparlör", "2.000 TL")]),
    ])
    .await?;
    let alerted = app.add(AMAZON_URL, 1000.0).await?;
    app.add(AMAZON_URL_2, 1000.0).await?;

    app.checker.run_all_active_product_checks().await?;
    let active = app.store.get_active_products().await?;
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].id, alerted.id);

    let summary = app.checker.run_all_active_product_checks().await?;
    assert_eq!(summary.checked, 1);
    assert_eq!(app.counters.navigations(AMAZON_URL), 1);
    assert_eq!(app.counters.navigations(AMAZON_URL_2), 2);
    assert_eq!(app.notifier.sent().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_history_follows_check_order() -> anyhow::Result<()> {
    let app = create_test_app(vec![(
        AMAZON_URL,
        vec![
            amazon_page("Kulaklık", "1.500 TL"),
            amazon_page("Kulaklık", "1.450 TL"),
            amazon_page("Kulaklık", "1.475 TL"),
        ],
    )])
    .await?;
    let product = app.add(AMAZON_URL, 1000.0).await?;

    for _ in 0..3 {
        app.checker.run_all_active_product_checks().await?;
    }

    let prices: Vec<f64> = app
        .store
        .price_history(product.id)
        .await?
        .iter()
        .map(|entry| entry.price)
        .collect();
    assert_eq!(prices, vec![1500.0, 1450.0, 1475.0]);
    assert_eq!(app.reload(&product).await?.current_price, Some(1475.0));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_batch_is_rejected() -> anyhow::Result<()> {
    let app = create_test_app(vec![
        (AMAZON_URL, vec![amazon_page("Kulaklık", "1.500 TL")]),
        (AMAZON_URL_2, vec![amazon_page("Hoparlör", "2.000 TL")]),
    ])
    .await?;
    app.add(AMAZON_URL, 1000.0).await?;
    app.add(AMAZON_URL_2, 1000.0).await?;

    let (first, second) = tokio::join!(
        app.checker.run_all_active_product_checks(),
        app.checker.run_all_active_product_checks()
    );

    assert_eq!(first?.checked, 2);
    assert!(matches!(second, Err(AppError::BatchInProgress)));
    assert_eq!(app.counters.launches(), 1);

    Ok(())
}
