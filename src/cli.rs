use clap::{Parser, Subcommand, ValueEnum};

use pricepal::storage::keys;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "PricePal - track product prices on Turkish retail sites",
    long_about = "PricePal scrapes product pages on supported sites (Amazon Türkiye, Hepsiburada) \
                  with a headless browser, records every observed price, and sends an email \
                  alert once a product drops to its target price. Run `check-all` from cron \
                  to check on a schedule."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml, <RUN_MODE>.toml and local.toml
    #[arg(short, long, value_name = "DIR", default_value = "config", global = true)]
    pub config_dir: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start tracking a product page
    Add {
        /// Product page URL
        url: String,

        /// Alert when the price is at or below this value
        target_price: f64,
    },
    /// List tracked products
    List,
    /// Change the target price or URL of a tracked product
    Edit {
        id: i64,

        /// New alert threshold
        #[arg(long)]
        target_price: Option<f64>,

        /// New product page URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Stop tracking a product and drop its price history
    Remove { id: i64 },
    /// Show recorded prices for a product
    History { id: i64 },
    /// Store a notification setting
    Set { key: SettingKey, value: String },
    /// Send a sample alert to the configured address
    TestEmail,
    /// Check one product now
    Check { id: i64 },
    /// Check every active product once
    CheckAll,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    #[value(name = "user_email")]
    UserEmail,
    #[value(name = "smtp_host")]
    SmtpHost,
    #[value(name = "smtp_port")]
    SmtpPort,
}

impl SettingKey {
    pub fn key(&self) -> &'static str {
        match self {
            SettingKey::UserEmail => keys::USER_EMAIL,
            SettingKey::SmtpHost => keys::SMTP_HOST,
            SettingKey::SmtpPort => keys::SMTP_PORT,
        }
    }
}
