//! Inline keyboard callback data.
//!
//! The strings are part of messages already sitting in customers' chats,
//! so parsing stays lenient: asset symbols are upper-cased, a missing
//! order type defaults to buy and anything unrecognised becomes
//! [`CallbackAction::Unknown`].

use rust_decimal::Decimal;
use shared::domain::OrderType;
use shared::Button;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Buy,
    Sell,
    Query,
    Help,
    Assets,
    Asset { order_type: OrderType, asset: String },
    Continue { asset: String, order_type: OrderType },
    CancelAmount,
    Amount { asset: String, order_type: OrderType, amount: Decimal },
    Repeat { asset: String, order_type: OrderType, amount: Decimal },
    Confirm { asset: String, order_type: OrderType, amount: Decimal, vendor_id: i32 },
    CancelOrder,
    CheckOrder,
    GeneralQuestion,
    BackToMenu,
    SwitchVendor,
    ContinueReceiving(i32),
    ContinueUpload(i32),
    ContactVendor(String),
    Unknown(String),
}

fn order_type(text: &str) -> Option<OrderType> {
    text.parse().ok()
}

fn asset(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric())).then(|| text.to_uppercase())
}

fn amount(text: &str) -> Option<Decimal> {
    Decimal::from_str(text.trim()).ok().filter(|a| *a > Decimal::ZERO)
}

/// `<ASSET>_<type>_<amount>` as used by amount, repeat and confirm.
fn trade_parts(rest: &str) -> Option<(String, OrderType, Decimal, Option<&str>)> {
    let mut parts = rest.splitn(4, '_');
    let asset = asset(parts.next()?)?;
    let order_type = order_type(parts.next()?)?;
    let amount = amount(parts.next()?)?;
    Some((asset, order_type, amount, parts.next()))
}

impl CallbackAction {
    pub fn button(&self, text: impl Into<String>) -> Button {
        Button::callback(text, self.to_string())
    }

    pub fn parse(data: &str) -> Self {
        let data = data.trim();
        Self::parse_known(data).unwrap_or_else(|| CallbackAction::Unknown(data.to_string()))
    }

    fn parse_known(data: &str) -> Option<Self> {
        let simple = match data {
            "buy" => Some(CallbackAction::Buy),
            "sell" => Some(CallbackAction::Sell),
            "query" => Some(CallbackAction::Query),
            "help" => Some(CallbackAction::Help),
            "assets" => Some(CallbackAction::Assets),
            "cancel_amount" => Some(CallbackAction::CancelAmount),
            "cancel_order" => Some(CallbackAction::CancelOrder),
            "check_order" => Some(CallbackAction::CheckOrder),
            "general_question" => Some(CallbackAction::GeneralQuestion),
            "back_to_menu" => Some(CallbackAction::BackToMenu),
            "switch_vendor" => Some(CallbackAction::SwitchVendor),
            _ => None,
        };
        if simple.is_some() {
            return simple;
        }

        if let Some(handle) = data.strip_prefix("contact_vendor@") {
            return Some(CallbackAction::ContactVendor(handle.trim_start_matches('@').to_string()));
        }
        if let Some(id) = data.strip_prefix("cont_recv_") {
            return id.parse().ok().map(CallbackAction::ContinueReceiving);
        }
        if let Some(id) = data.strip_prefix("cont_upload_") {
            return id.parse().ok().map(CallbackAction::ContinueUpload);
        }
        if let Some(rest) = data.strip_prefix("cont_") {
            let (asset_part, type_part) = rest.split_once('_')?;
            return Some(CallbackAction::Continue {
                asset: asset(asset_part)?,
                order_type: order_type(type_part)?,
            });
        }
        if let Some(rest) = data.strip_prefix("asset_") {
            return match rest.split_once('_') {
                Some((type_part, asset_part)) => Some(CallbackAction::Asset {
                    order_type: order_type(type_part)?,
                    asset: asset(asset_part)?,
                }),
                None => Some(CallbackAction::Asset {
                    order_type: OrderType::Buy,
                    asset: asset(rest)?,
                }),
            };
        }
        if let Some(rest) = data.strip_prefix("amount_") {
            let (asset, order_type, amount, _) = trade_parts(rest)?;
            return Some(CallbackAction::Amount { asset, order_type, amount });
        }
        if let Some(rest) = data.strip_prefix("repeat_") {
            let (asset, order_type, amount, _) = trade_parts(rest)?;
            return Some(CallbackAction::Repeat { asset, order_type, amount });
        }
        if let Some(rest) = data.strip_prefix("confirm_") {
            let (asset, order_type, amount, vendor) = trade_parts(rest)?;
            return Some(CallbackAction::Confirm {
                asset,
                order_type,
                amount,
                vendor_id: vendor?.parse().ok()?,
            });
        }
        None
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Buy => f.write_str("buy"),
            CallbackAction::Sell => f.write_str("sell"),
            CallbackAction::Query => f.write_str("query"),
            CallbackAction::Help => f.write_str("help"),
            CallbackAction::Assets => f.write_str("assets"),
            CallbackAction::Asset { order_type, asset } => write!(f, "asset_{}_{}", order_type, asset),
            CallbackAction::Continue { asset, order_type } => write!(f, "cont_{}_{}", asset, order_type),
            CallbackAction::CancelAmount => f.write_str("cancel_amount"),
            CallbackAction::Amount { asset, order_type, amount } => {
                write!(f, "amount_{}_{}_{}", asset, order_type, amount.normalize())
            }
            CallbackAction::Repeat { asset, order_type, amount } => {
                write!(f, "repeat_{}_{}_{}", asset, order_type, amount.normalize())
            }
            CallbackAction::Confirm {
                asset,
                order_type,
                amount,
                vendor_id,
            } => write!(f, "confirm_{}_{}_{}_{}", asset, order_type, amount.normalize(), vendor_id),
            CallbackAction::CancelOrder => f.write_str("cancel_order"),
            CallbackAction::CheckOrder => f.write_str("check_order"),
            CallbackAction::GeneralQuestion => f.write_str("general_question"),
            CallbackAction::BackToMenu => f.write_str("back_to_menu"),
            CallbackAction::SwitchVendor => f.write_str("switch_vendor"),
            CallbackAction::ContinueReceiving(id) => write!(f, "cont_recv_{}", id),
            CallbackAction::ContinueUpload(id) => write!(f, "cont_upload_{}", id),
            CallbackAction::ContactVendor(handle) => write!(f, "contact_vendor@{}", handle),
            CallbackAction::Unknown(data) => f.write_str(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trade_callbacks() {
        assert_eq!(
            CallbackAction::parse("confirm_usdt_sell_12.5_7"),
            CallbackAction::Confirm {
                asset: "USDT".to_string(),
                order_type: OrderType::Sell,
                amount: Decimal::from_str("12.5").unwrap(),
                vendor_id: 7,
            }
        );
        assert_eq!(
            CallbackAction::parse("asset_BTC"),
            CallbackAction::Asset {
                order_type: OrderType::Buy,
                asset: "BTC".to_string()
            }
        );
        assert_eq!(CallbackAction::parse("cont_recv_42"), CallbackAction::ContinueReceiving(42));
        assert_eq!(
            CallbackAction::parse("cont_ETH_sell"),
            CallbackAction::Continue {
                asset: "ETH".to_string(),
                order_type: OrderType::Sell
            }
        );
    }

    #[test]
    fn malformed_data_is_unknown() {
        for data in ["confirm_USDT_buy_abc_1", "amount_USDT_hold_5", "cont_upload_x", "repeat_", "noop"] {
            assert_eq!(CallbackAction::parse(data), CallbackAction::Unknown(data.to_string()), "{}", data);
        }
        assert_eq!(CallbackAction::parse("amount_USDT_buy_-3"), CallbackAction::Unknown("amount_USDT_buy_-3".to_string()));
    }

    #[test]
    fn rendered_buttons_parse_back() {
        let repeat = CallbackAction::Repeat {
            asset: "USDT".to_string(),
            order_type: OrderType::Buy,
            amount: Decimal::from_str("100.00").unwrap(),
        };
        assert_eq!(repeat.to_string(), "repeat_USDT_buy_100");
        assert_eq!(CallbackAction::parse(&repeat.to_string()), repeat);
    }
}
