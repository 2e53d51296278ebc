use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};
use validator::Validate;

use super::ProductStore;
use crate::config::DatabaseConfig;
use crate::models::{NewProduct, PriceHistoryEntry, Product, ProductStatus, ProductUpdate};
use crate::scraping::dispatcher::site_for_url;
use crate::{AppError, Result};

const PRODUCT_COLUMNS: &str = "id, url, site, name, target_price, current_price, status, is_active, added_date, last_check_date";

/// Products, price history and settings in one SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        info!("Connected to database {}", config.url);
        Self::from_pool(pool).await
    }

    /// Private database that lives as long as the store.
    pub async fn in_memory() -> Result<Self> {
        // Each connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Start tracking a URL. The site key is fixed here from the URL's host.
    pub async fn add_product(&self, new_product: NewProduct) -> Result<Product> {
        new_product.validate()?;
        let site = site_for_url(&new_product.url)?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE url = ?")
            .bind(&new_product.url)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Validation(format!("{} is already tracked", new_product.url)));
        }

        let id = sqlx::query(
            "INSERT INTO products (url, site, target_price, status, is_active, added_date) VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(&new_product.url)
        .bind(site.key())
        .bind(new_product.target_price)
        .bind(ProductStatus::Pending)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(product_id = id, site = %site, "Added product {}", new_product.url);
        self.get_product_by_id(id).await?.ok_or_else(|| AppError::Internal(format!(
            "product {} missing right after insert",
            id
        )))
    }

    /// Change the URL and/or target price of a tracked product.
    ///
    /// A new URL must still be supported and not tracked by another product;
    /// the site key follows it. Status, prices and history are left alone.
    pub async fn update_target(&self, id: i64, url: Option<&str>, target_price: Option<f64>) -> Result<Product> {
        let product = self
            .get_product_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound { resource: format!("product {}", id) })?;

        let edited = NewProduct {
            url: url.unwrap_or(&product.url).to_string(),
            target_price: target_price.unwrap_or(product.target_price),
        };
        edited.validate()?;
        let site = site_for_url(&edited.url)?;

        if edited.url != product.url {
            let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE url = ? AND id <> ?")
                .bind(&edited.url)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            if existing.is_some() {
                return Err(AppError::Validation(format!("{} is already tracked", edited.url)));
            }
        }

        sqlx::query("UPDATE products SET url = ?, site = ?, target_price = ? WHERE id = ?")
            .bind(&edited.url)
            .bind(site.key())
            .bind(edited.target_price)
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(product_id = id, site = %site, target = edited.target_price, "Edited product {}", edited.url);
        self.get_product_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound { resource: format!("product {}", id) })
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY added_date DESC, id DESC", PRODUCT_COLUMNS);
        Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn delete_product(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM price_history WHERE product_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(AppError::NotFound { resource: format!("product {}", id) });
        }
        tx.commit().await?;
        Ok(())
    }

    /// Observed prices for a product in the order they were recorded.
    pub async fn price_history(&self, product_id: i64) -> Result<Vec<PriceHistoryEntry>> {
        Ok(sqlx::query_as::<_, PriceHistoryEntry>(
            "SELECT id, product_id, price, observed_at FROM price_history WHERE product_id = ? ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProductStore for SqliteStore {
    async fn get_active_products(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {} FROM products WHERE is_active = 1 ORDER BY id", PRODUCT_COLUMNS);
        Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_product_by_id(&self, id: i64) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE products SET ");
        let mut fields = builder.separated(", ");
        if let Some(name) = &update.name {
            fields.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(price) = update.current_price {
            fields.push("current_price = ").push_bind_unseparated(price);
        }
        if let Some(status) = update.status {
            fields.push("status = ").push_bind_unseparated(status);
        }
        if let Some(is_active) = update.is_active {
            fields.push("is_active = ").push_bind_unseparated(is_active);
        }
        if let Some(checked) = update.last_check_date {
            fields.push("last_check_date = ").push_bind_unseparated(checked);
        }
        builder.push(" WHERE id = ").push_bind(id);

        let updated = builder.build().execute(&self.pool).await?.rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound { resource: format!("product {}", id) });
        }
        debug!(product_id = id, "Product updated");
        Ok(())
    }

    async fn add_price_history(&self, product_id: i64, price: f64) -> Result<()> {
        sqlx::query("INSERT INTO price_history (product_id, price, observed_at) VALUES (?, ?, ?)")
            .bind(product_id)
            .bind(price)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
