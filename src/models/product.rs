use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::ProductStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Product {
    pub id: i64,
    pub url: String,
    /// Short site key derived from the domain when the product was added.
    pub site: String,
    pub name: Option<String>,
    pub target_price: f64,
    pub current_price: Option<f64>,
    pub status: ProductStatus,
    pub is_active: bool,
    pub added_date: DateTime<Utc>,
    pub last_check_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(url)]
    pub url: String,
    #[validate(range(min = 0.01))]
    pub target_price: f64,
}

/// Partial field set written back after a check. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub current_price: Option<f64>,
    pub status: Option<ProductStatus>,
    pub is_active: Option<bool>,
    pub last_check_date: Option<DateTime<Utc>>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.current_price.is_none()
            && self.status.is_none()
            && self.is_active.is_none()
            && self.last_check_date.is_none()
    }
}

impl Product {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}
