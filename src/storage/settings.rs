use async_trait::async_trait;

use super::{SettingsStore, SqliteStore};
use crate::Result;

/// User settings from the database, with the SMTP password kept out of it.
#[derive(Debug, Clone)]
pub struct AppSettings {
    store: SqliteStore,
    email_password: Option<String>,
}

impl AppSettings {
    pub fn new(store: SqliteStore, email_password: Option<String>) -> Self {
        Self { store, email_password }
    }
}

#[async_trait]
impl SettingsStore for AppSettings {
    async fn get(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .store
            .get_setting(key)
            .await?
            .unwrap_or_else(|| default.to_string()))
    }

    async fn get_email_password(&self) -> Result<Option<String>> {
        Ok(self.email_password.clone().filter(|password| !password.is_empty()))
    }
}
