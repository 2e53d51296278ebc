//! Outbound alerts sent when a product reaches its target price.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SmtpConfig;
use crate::storage::{keys, SettingsStore};
use crate::{AppError, Result};

pub mod email;

pub use email::EmailNotifier;

const TEST_PRODUCT_NAME: &str = "Test Ürünü";
const TEST_PRICE: f64 = 99.99;
const TEST_PRODUCT_URL: &str = "https://github.com/Rtur2003/PricePal";

/// Everything needed to deliver one price alert.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAlert {
    pub sender_email: String,
    pub password: String,
    pub recipient_email: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub product_name: String,
    pub new_price: f64,
    pub product_url: String,
}

impl PriceAlert {
    /// Build an alert the user sends to themselves, with SMTP host and port
    /// taken from stored settings and falling back to `smtp`.
    pub async fn from_settings(
        settings: &dyn SettingsStore,
        smtp: &SmtpConfig,
        product_name: &str,
        new_price: f64,
        product_url: &str,
    ) -> Result<Self> {
        let user_email = settings.get(keys::USER_EMAIL, "").await?;
        let password = settings.get_email_password().await?.unwrap_or_default();
        let smtp_host = settings.get(keys::SMTP_HOST, &smtp.host).await?;
        let port_setting = settings.get(keys::SMTP_PORT, &smtp.port.to_string()).await?;
        let smtp_port = port_setting.trim().parse::<u16>().unwrap_or_else(|_| {
            warn!("Invalid smtp_port setting '{}', using {}", port_setting, smtp.port);
            smtp.port
        });

        Ok(Self {
            sender_email: user_email.clone(),
            password,
            recipient_email: user_email,
            smtp_host,
            smtp_port,
            product_name: product_name.to_string(),
            new_price,
            product_url: product_url.to_string(),
        })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Returns whether the alert was delivered. Failures are reported, never raised.
    async fn send_price_alert(&self, alert: &PriceAlert) -> bool;
}

/// Send a sample alert with the stored settings to check that delivery works.
///
/// Missing credentials are a validation error; a delivery failure is `Ok(false)`.
pub async fn send_test_email(
    notifier: &dyn AlertNotifier,
    settings: &dyn SettingsStore,
    smtp: &SmtpConfig,
) -> Result<bool> {
    let alert = PriceAlert::from_settings(settings, smtp, TEST_PRODUCT_NAME, TEST_PRICE, TEST_PRODUCT_URL).await?;
    if alert.recipient_email.trim().is_empty() || alert.password.is_empty() {
        return Err(AppError::Validation(
            "user_email and the SMTP password must both be set before sending a test email".to_string(),
        ));
    }

    info!(recipient = %alert.recipient_email, host = %alert.smtp_host, port = alert.smtp_port, "Sending test email");
    Ok(notifier.send_price_alert(&alert).await)
}
