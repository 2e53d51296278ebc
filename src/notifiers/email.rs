use async_trait::async_trait;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use super::{AlertNotifier, PriceAlert};
use crate::{AppError, Result};

/// Port that expects TLS from the first byte; everything else upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Default, Clone)]
pub struct EmailNotifier;

impl EmailNotifier {
    pub fn new() -> Self {
        EmailNotifier
    }

    fn format_subject(alert: &PriceAlert) -> String {
        format!(
            "Price alert: '{}' dropped to {} TL",
            alert.product_name,
            format_price(alert.new_price)
        )
    }

    fn format_text_body(alert: &PriceAlert) -> String {
        let mut text = String::new();
        text.push_str("PRICEPAL PRICE ALERT\n\n");
        text.push_str(&format!(
            "{} is now below your target price.\n",
            alert.product_name
        ));
        text.push_str(&format!("New price: {} TL\n\n", format_price(alert.new_price)));
        text.push_str(&format!("View product: {}\n", alert.product_url));
        text
    }

    fn format_html_body(alert: &PriceAlert) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; margin: 20px;">
    <h2>Price alert</h2>
    <p><b>{}</b> is now below your target price.</p>
    <p style="font-size: 24px; font-weight: bold; color: #28a745;">New price: {} TL</p>
    <p>
        <a href="{}" style="background: #007bff; color: white; padding: 10px 15px; text-decoration: none; border-radius: 5px;">View product</a>
    </p>
    <hr>
    <p><small>Sent automatically by PricePal.</small></p>
</body>
</html>
"#,
            alert.product_name,
            format_price(alert.new_price),
            alert.product_url
        )
    }

    fn build_message(alert: &PriceAlert) -> Result<Message> {
        let from: Mailbox = alert
            .sender_email
            .parse()
            .map_err(|e| AppError::Email(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = alert
            .recipient_email
            .parse()
            .map_err(|e| AppError::Email(format!("invalid recipient address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(Self::format_subject(alert))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(Self::format_text_body(alert)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(Self::format_html_body(alert)),
                    ),
            )
            .map_err(|e| AppError::Email(e.to_string()))
    }

    async fn deliver(alert: &PriceAlert) -> Result<()> {
        let message = Self::build_message(alert)?;
        let credentials = Credentials::new(alert.sender_email.clone(), alert.password.clone());

        let builder = if alert.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&alert.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&alert.smtp_host)
        }
        .map_err(|e| AppError::Email(e.to_string()))?;

        let mailer = builder.port(alert.smtp_port).credentials(credentials).build();
        mailer
            .send(message)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl AlertNotifier for EmailNotifier {
    async fn send_price_alert(&self, alert: &PriceAlert) -> bool {
        if alert.sender_email.is_empty() || alert.password.is_empty() || alert.recipient_email.is_empty() {
            warn!("Email credentials are incomplete; price alert for '{}' not sent", alert.product_name);
            return false;
        }

        match Self::deliver(alert).await {
            Ok(()) => {
                info!(recipient = %alert.recipient_email, "Price alert sent for '{}'", alert.product_name);
                true
            }
            Err(e) => {
                warn!(smtp_host = %alert.smtp_host, smtp_port = alert.smtp_port, "Price alert for '{}' failed: {}", alert.product_name, e);
                false
            }
        }
    }
}

/// `1234567.891` -> `1,234,567.89`
pub fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}
