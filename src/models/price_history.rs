use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One observed price. Rows are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PriceHistoryEntry {
    pub id: i64,
    pub product_id: i64,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}
