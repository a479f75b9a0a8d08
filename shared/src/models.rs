use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{BroadcastType, OrderType, Plan};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionStatus {
    pub plan: Plan,
    pub is_trial: bool,
    pub trial_expires_at: Option<DateTime<Utc>>,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub is_service_active: bool,
    pub daily_order_limit: Option<i32>,
    pub orders_today: i32,
}

/// Public track record shown to customers in the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrustStats {
    pub completed_trades: u64,
    pub typical_release_minutes: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub asset: String,
    pub order_type: OrderType,
    pub amount: Decimal,
    /// Falls back to the vendor's configured rate when absent.
    pub rate: Option<Decimal>,
    pub customer_chat_id: Option<i64>,
    pub customer_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptOrder {
    pub acceptance_note: Option<String>,
    pub pay_instructions: Option<String>,
    pub send_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateInput {
    pub asset: String,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub contract_address: Option<String>,
    pub bank_details: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorUpdate {
    pub name: Option<String>,
    pub telegram_username: Option<String>,
    pub bio: Option<String>,
    pub bank_details: Option<String>,
    pub auto_expire_minutes: Option<i32>,
    pub auto_accept: Option<bool>,
    pub is_available: Option<bool>,
    pub unavailable_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankDetailInput {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    pub instructions: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBroadcast {
    pub message_type: Option<BroadcastType>,
    pub title: String,
    pub content: String,
}

/// File received over HTTP or from Telegram, before it is stored.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: u64,
    pub notified: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct BroadcastReport {
    pub recipients: u64,
    pub delivered: u64,
}
