//! Persistence seams used by the price checker, plus the SQLite implementation.

use async_trait::async_trait;

use crate::models::{Product, ProductUpdate};
use crate::Result;

pub mod settings;
pub mod sqlite;

pub use settings::AppSettings;
pub use sqlite::SqliteStore;

/// Setting keys read during a check.
pub mod keys {
    pub const USER_EMAIL: &str = "user_email";
    pub const SMTP_HOST: &str = "smtp_host";
    pub const SMTP_PORT: &str = "smtp_port";
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_active_products(&self) -> Result<Vec<Product>>;

    async fn get_product_by_id(&self, id: i64) -> Result<Option<Product>>;

    /// Write every set field of `update` in one statement.
    async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<()>;

    async fn add_price_history(&self, product_id: i64, price: f64) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str, default: &str) -> Result<String>;

    async fn get_email_password(&self) -> Result<Option<String>>;
}
