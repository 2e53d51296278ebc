use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub browser: BrowserConfig,
    pub checker: CheckerConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Launch and navigation settings for the shared headless browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<String>,
    pub user_agent: String,
    pub page_load_timeout_secs: u64,
    /// Wait after navigation so client-side rendering can finish.
    pub settle_delay_ms: u64,
    /// Total navigation attempts per fetch, first try included.
    pub fetch_attempts: u32,
    pub retry_delay_ms: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Pause between two products of a batch run.
    pub product_delay_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<String>,
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://pricepal.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_load_timeout_secs: 45,
            settle_delay_ms: 5000,
            fetch_attempts: 2,
            retry_delay_ms: 5000,
            idle_timeout_secs: 600,
        }
    }
}

impl BrowserConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            product_delay_ms: 5000,
        }
    }
}

impl CheckerConfig {
    pub fn product_delay(&self) -> Duration {
        Duration::from_millis(self.product_delay_ms)
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            password: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_dir("config")
    }

    pub fn from_dir(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Built-in defaults sit underneath every file
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Local overrides (ignored by git)
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            // PRICEPAL__BROWSER__FETCH_ATTEMPTS=3 style overrides
            .add_source(Environment::with_prefix("PRICEPAL").prefix_separator("__").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(ConfigError::Message("Database url must be a sqlite: URL".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }

        if self.browser.fetch_attempts == 0 {
            return Err(ConfigError::Message("Browser fetch_attempts must be greater than 0".into()));
        }

        if self.browser.page_load_timeout_secs == 0 {
            return Err(ConfigError::Message("Browser page_load_timeout_secs must be greater than 0".into()));
        }

        if self.browser.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Browser user_agent must not be empty".into()));
        }

        if self.notifications.smtp.port == 0 {
            return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
        }

        if self.notifications.smtp.host.trim().is_empty() {
            return Err(ConfigError::Message("SMTP host must not be empty".into()));
        }

        if let Some(chrome_path) = &self.browser.chrome_path {
            if Url::parse(chrome_path).is_ok_and(|u| u.scheme() != "file") {
                return Err(ConfigError::Message("Browser chrome_path must be a filesystem path".into()));
            }
        }

        Ok(())
    }
}
