use regex::Regex;
use std::sync::LazyLock;

static CURRENCY_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"try|tl|₺").unwrap());

/// Convert Turkish-formatted price text such as `"1.499,90 TL"` into a number.
///
/// Dots are thousands separators and the comma is the decimal mark, except for text
/// that is already plain decimal (`"1499.9"`), which parses unchanged. The result is
/// rounded to kuruş, so a normalized value normalizes to itself. Returns `0.0` when
/// nothing numeric can be read; callers treat that as "no price".
pub fn normalize_price(raw: &str) -> f64 {
    let lowered = raw.to_lowercase();
    let stripped = CURRENCY_TOKENS.replace_all(&lowered, "");
    let text = stripped.trim();
    if text.is_empty() {
        return 0.0;
    }

    let text = if is_plain_decimal(text) {
        text.to_string()
    } else {
        text.replace('.', "").replace(',', ".")
    };

    let mut seen_point = false;
    let cleaned: String = text
        .chars()
        .filter(|c| match c {
            '0'..='9' => true,
            '.' if !seen_point => {
                seen_point = true;
                true
            }
            _ => false,
        })
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| (value * 100.0).round() / 100.0)
        .unwrap_or(0.0)
}

// A lone dot followed by one or two digits is a decimal point; "1.499" stays a
// thousands separator.
fn is_plain_decimal(text: &str) -> bool {
    if text.contains(',') {
        return false;
    }
    let mut parts = text.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(fraction), None) => {
            let digits = fraction.chars().take_while(char::is_ascii_digit).count();
            (1..=2).contains(&digits)
        }
        _ => false,
    }
}
