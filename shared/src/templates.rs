use askama::Template;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Two decimal places with thousands separators, e.g. `150,000.00`.
pub fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let text = format!("{:.2}", rounded);
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Asset amount without trailing zeros, e.g. `0.5`.
pub fn format_amount(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[derive(Template)]
#[template(path = "order_accepted.txt", escape = "none")]
pub struct OrderAcceptedMessage<'a> {
    pub order_code: &'a str,
    pub asset: &'a str,
    pub order_type: &'a str,
    pub amount: String,
    pub rate: String,
    pub total: String,
    pub pay_instructions: Option<&'a str>,
    pub send_instructions: Option<&'a str>,
    pub note: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "order_declined.txt", escape = "none")]
pub struct OrderDeclinedMessage<'a> {
    pub order_code: &'a str,
    pub reason: &'a str,
}

#[derive(Template)]
#[template(path = "order_preview.txt", escape = "none")]
pub struct OrderPreviewMessage<'a> {
    pub vendor_name: &'a str,
    pub asset: &'a str,
    pub order_type: &'a str,
    pub amount: String,
    pub rate: String,
    pub total: String,
}

#[derive(Template)]
#[template(path = "order_status.txt", escape = "none")]
pub struct OrderStatusMessage<'a> {
    pub order_code: &'a str,
    pub order_type: &'a str,
    pub asset: &'a str,
    pub amount: String,
    pub total: String,
    pub status: &'a str,
    pub accepted_at: Option<String>,
    pub declined_at: Option<String>,
    pub completed_at: Option<String>,
    pub proof_uploaded_at: Option<String>,
    pub transaction_created_at: Option<String>,
}

#[derive(Template)]
#[template(path = "welcome.txt", escape = "none")]
pub struct WelcomeMessage<'a> {
    pub possessive: Option<String>,
    pub vendor_name: &'a str,
    pub completed_trades: u64,
    pub typical_release_minutes: Option<i64>,
    pub bio: Option<String>,
}

#[derive(Template)]
#[template(path = "transaction_completed.txt", escape = "none")]
pub struct TransactionCompletedMessage<'a> {
    pub order_code: &'a str,
    pub vendor_name: &'a str,
    pub order_type: &'a str,
    pub asset: &'a str,
    pub amount: String,
    pub total: String,
    pub has_proof: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn money_is_grouped() {
        assert_eq!(format_money(Decimal::from(150000)), "150,000.00");
        assert_eq!(format_money(Decimal::from_str("999.5").unwrap()), "999.50");
        assert_eq!(format_money(Decimal::from_str("-1234567.891").unwrap()), "-1,234,567.89");
        assert_eq!(format_amount(Decimal::from_str("0.500").unwrap()), "0.5");
    }

    #[test]
    fn accepted_message_includes_only_present_sections() {
        let text = OrderAcceptedMessage {
            order_code: "ORD-01-01012025-1-001",
            asset: "USDT",
            order_type: "Buy",
            amount: "100".to_string(),
            rate: "1,500.00".to_string(),
            total: "150,000.00".to_string(),
            pay_instructions: Some("Bank: Zenith"),
            send_instructions: None,
            note: None,
        }
        .render()
        .unwrap();
        assert!(text.starts_with("✅ Order ORD-01-01012025-1-001 accepted"));
        assert!(text.contains("Payment Details:\nBank: Zenith"));
        assert!(!text.contains("Send to:"));
        assert!(!text.contains("Note:"));
    }

    #[test]
    fn welcome_without_vendor_is_generic() {
        let text = WelcomeMessage {
            possessive: None,
            vendor_name: "",
            completed_trades: 0,
            typical_release_minutes: None,
            bio: None,
        }
        .render()
        .unwrap();
        assert!(text.starts_with("Welcome to Vendora! 🚀"));
        assert!(!text.contains("successful trades"));
    }
}
