pub mod checker;
pub mod config;
pub mod models;
pub mod notifiers;
pub mod scraping;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use checker::{BatchSummary, CheckOutcome, PriceChecker};
pub use config::AppConfig;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
