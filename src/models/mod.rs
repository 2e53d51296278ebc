use serde::{Deserialize, Serialize};
use std::fmt;

pub mod product;
pub mod price_history;

// Re-exports for convenience
pub use product::*;
pub use price_history::*;

/// Where a product stands after its most recent check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// Added but never checked.
    Pending,
    Tracking,
    PriceAlert,
    /// Last check failed; the next successful check clears it.
    Error,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Pending => "PENDING",
            ProductStatus::Tracking => "TRACKING",
            ProductStatus::PriceAlert => "PRICE_ALERT",
            ProductStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
