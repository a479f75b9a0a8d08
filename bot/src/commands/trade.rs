use anyhow::Result;
use askama::Template;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::domain::OrderType;
use shared::entity::{orders, vendors};
use shared::gating;
use shared::models::{AcceptOrder, NewOrder};
use shared::templates::{format_amount, format_money, OrderPreviewMessage};
use shared::{Keyboard, VendoraError};
use std::str::FromStr;
use tracing::{info, warn};

use super::start::main_menu;
use super::{explain, linked_vendor, main_menu_row, Reply};
use crate::callback::CallbackAction;
use crate::state::{AppState, Event, Session};

/// Order details carried by the confirm button.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub asset: String,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub vendor_id: i32,
}

fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    Decimal::from_str(&cleaned).ok().filter(|a| *a > Decimal::ZERO)
}

pub async fn handle_trade_menu(app: &AppState, session: &mut Session, order_type: OrderType) -> Result<Reply> {
    let vendor = linked_vendor(app, session).await?;
    let assets = app.services.rates.assets(vendor.as_ref().map(|v| v.id)).await?;
    if assets.is_empty() {
        return Ok(Reply::text("No assets available yet.").with_keyboard(main_menu_row()));
    }
    let prompt = match (order_type, &vendor) {
        (OrderType::Buy, Some(v)) => format!("What would you like to buy from {}? Select an asset:", v.name),
        (OrderType::Sell, Some(v)) => format!("What would you like to sell to {}? Select an asset:", v.name),
        (OrderType::Buy, None) => "What would you like to buy? Select an asset:".to_string(),
        (OrderType::Sell, None) => "What would you like to sell? Select an asset:".to_string(),
    };
    let mut rows: Keyboard = assets
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|asset| {
                    CallbackAction::Asset {
                        order_type,
                        asset: asset.clone(),
                    }
                    .button(asset.as_str())
                })
                .collect()
        })
        .collect();
    rows.push(vec![CallbackAction::BackToMenu.button("🔙 Back to Menu")]);
    Ok(Reply::text(prompt).with_keyboard(rows))
}

/// Where the customer pays (buy) or sends the asset (sell).
async fn settlement_details(
    app: &AppState,
    vendor: &vendors::Model,
    rate: &shared::entity::rates::Model,
    order_type: OrderType,
) -> Result<Option<String>> {
    let details = match order_type {
        OrderType::Buy => match app.services.vendors.default_bank_detail(vendor.id).await? {
            Some(bank) => Some(format!("Bank Details:\n{}", bank.as_instructions().trim_end())),
            None => rate
                .bank_details
                .clone()
                .or_else(|| vendor.bank_details.clone())
                .filter(|s| !s.trim().is_empty())
                .map(|s| format!("Bank Details:\n{}", s.trim())),
        },
        OrderType::Sell => rate
            .contract_address
            .clone()
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("Contract Address:\n{}", s.trim())),
    };
    Ok(details)
}

pub async fn handle_asset(app: &AppState, session: &mut Session, asset: &str, order_type: OrderType) -> Result<Reply> {
    let mut vendor = linked_vendor(app, session).await?;
    if vendor.is_none() {
        // An unlinked chat picking an asset only one vendor offers goes to that vendor
        let offering = app.services.vendors.repo().with_asset(asset).await?;
        if let [only] = offering.as_slice() {
            session.user = app
                .services
                .sessions
                .link_vendor(session.user.clone(), Some(only.id), true)
                .await?;
            vendor = Some(only.clone());
        }
    }
    let Some(vendor) = vendor else {
        session.apply(Event::AskVendor);
        return Ok(Reply::text(
            "Please send the vendor's username, ID, or code to link this chat to that vendor.",
        ));
    };
    let Some(rate) = app.services.rates.find(vendor.id, asset).await? else {
        return Ok(Reply::text(format!("No rate found for {}.", asset)).with_keyboard(main_menu_row()));
    };

    let icon = match order_type {
        OrderType::Buy => "🛒",
        OrderType::Sell => "💰",
    };
    let mut text = format!(
        "{} {} {}\n\n{} Rate: ₦{} per {}",
        icon,
        order_type.as_str().to_uppercase(),
        rate.asset,
        order_type.label(),
        format_money(rate.rate_for(order_type)),
        rate.asset
    );
    if let Some(details) = settlement_details(app, &vendor, &rate, order_type).await? {
        text.push_str("\n\n");
        text.push_str(&details);
    }
    text.push_str("\n\nTap Continue to enter amount or Cancel to go back.");

    let back = match order_type {
        OrderType::Buy => CallbackAction::Buy,
        OrderType::Sell => CallbackAction::Sell,
    };
    let keyboard = vec![
        vec![
            CallbackAction::Continue {
                asset: rate.asset.clone(),
                order_type,
            }
            .button("✅ Continue"),
            CallbackAction::BackToMenu.button("❌ Cancel"),
        ],
        vec![back.button("🔙 Back"), CallbackAction::BackToMenu.button("🏠 Main Menu")],
    ];
    Ok(Reply::text(text).with_keyboard(keyboard))
}

pub fn handle_continue(session: &mut Session, asset: &str, order_type: OrderType) -> Reply {
    session.apply(Event::ChooseAmount {
        asset: asset.to_string(),
        order_type,
    });
    Reply::text(format!(
        "Please enter the amount you want to {} for {}.",
        order_type, asset
    ))
    .with_keyboard(vec![vec![
        CallbackAction::CancelAmount.button("❌ Cancel"),
        CallbackAction::BackToMenu.button("🏠 Main Menu"),
    ]])
}

pub async fn handle_cancel_amount(app: &AppState, session: &mut Session) -> Result<Reply> {
    if session.apply(Event::CancelAmount) {
        session.record.temp_asset = None;
        session.record.temp_type = None;
    }
    let vendor = linked_vendor(app, session).await?;
    Ok(Reply::text("❌ Cancelled. Choose an option below:").with_keyboard(main_menu(vendor.as_ref())))
}

pub async fn handle_amount_input(
    app: &AppState,
    session: &mut Session,
    asset: &str,
    order_type: OrderType,
    text: &str,
) -> Result<Reply> {
    let Some(amount) = parse_amount(text) else {
        return Ok(Reply::text("❌ Invalid amount. Please try again.").with_keyboard(vec![vec![
            CallbackAction::CancelAmount.button("❌ Cancel"),
        ]]));
    };
    session.apply(Event::AmountEntered);
    handle_preview(app, session, asset, order_type, amount).await
}

/// Shows the order summary with a confirm button.
pub async fn handle_preview(
    app: &AppState,
    session: &mut Session,
    asset: &str,
    order_type: OrderType,
    amount: Decimal,
) -> Result<Reply> {
    let Some(vendor) = linked_vendor(app, session).await? else {
        return Ok(Reply::text("❌ Vendor information missing. Please restart the bot."));
    };
    if let Err(denial) = gating::check_service(&vendor, Utc::now()) {
        return Ok(Reply::text(denial.customer_message()));
    }
    let Some(rate) = app.services.rates.find(vendor.id, asset).await? else {
        return Ok(Reply::text(format!("No rate found for {}.", asset)).with_keyboard(main_menu_row()));
    };
    let unit = rate.rate_for(order_type);
    let text = OrderPreviewMessage {
        vendor_name: &vendor.name,
        asset: &rate.asset,
        order_type: order_type.label(),
        amount: format_amount(amount),
        rate: format_money(unit),
        total: format_money(orders::total_value(amount, unit)),
    }
    .render()?;

    session.record.temp_asset = Some(rate.asset.clone());
    session.record.temp_type = Some(order_type.as_str().to_string());
    session.record.temp_amount = Some(amount);

    let keyboard = vec![
        vec![
            CallbackAction::Confirm {
                asset: rate.asset.clone(),
                order_type,
                amount,
                vendor_id: vendor.id,
            }
            .button("✅ Confirm Order"),
            CallbackAction::CancelOrder.button("❌ Cancel"),
        ],
        vec![
            CallbackAction::Asset {
                order_type,
                asset: rate.asset.clone(),
            }
            .button("🔙 Back"),
            CallbackAction::BackToMenu.button("🏠 Main Menu"),
        ],
    ];
    Ok(Reply::text(text).with_keyboard(keyboard))
}

/// Places the order. Vendors with auto-accept take it on the spot and the
/// customer goes straight to uploading proof.
pub async fn handle_confirm(
    app: &AppState,
    session: &mut Session,
    request: OrderRequest,
    from_name: Option<&str>,
) -> Result<Reply> {
    let vendor = match app.services.vendors.get(request.vendor_id).await {
        Ok(vendor) => vendor,
        Err(VendoraError::NotFound(_)) => {
            return Ok(Reply::text("❌ Vendor information missing. Please restart the bot."))
        }
        Err(e) => return Err(e.into()),
    };
    if let Err(denial) = gating::check_availability(&vendor) {
        return Ok(Reply::text(denial.customer_message()));
    }
    let input = NewOrder {
        asset: request.asset.clone(),
        order_type: request.order_type,
        amount: request.amount,
        rate: None,
        customer_chat_id: Some(session.chat_id()),
        customer_name: from_name.map(str::to_string),
    };
    let order = match app.services.orders.create(&vendor, input).await {
        Ok(order) => order,
        Err(e) => return explain(e),
    };
    info!(
        chat_id = session.chat_id(),
        vendor_id = vendor.id,
        "order {} created from the bot",
        order.order_code
    );

    if session.vendor_id() != Some(vendor.id) {
        session.user = app
            .services
            .sessions
            .link_vendor(session.user.clone(), Some(vendor.id), true)
            .await?;
    }
    session.remember_order(order.id, &order.asset, request.order_type, request.amount);

    if vendor.auto_accept {
        match app.services.orders.accept(&vendor, order.id, AcceptOrder::default()).await {
            Ok((order, _)) => {
                session.apply(Event::OrderAutoAccepted { order_id: order.id });
                return Ok(Reply::text(format!(
                    "✅ Your order {} was accepted automatically.\n\nPlease upload your payment/on-chain proof now (image or document).",
                    order.order_code
                )));
            }
            Err(e) => warn!("auto-accept of order {} failed: {}", order.order_code, e),
        }
    }

    session.apply(Event::Reset);
    Ok(Reply::text(format!(
        "Thanks! Your order with Order ID: {} has been created and is pending acceptance from the vendor. You'll be notified when it's accepted.",
        order.order_code
    ))
    .with_keyboard(main_menu_row()))
}

pub fn handle_cancel_order(session: &mut Session) -> Reply {
    session.apply(Event::Reset);
    session.record.temp_amount = None;
    Reply::text("❌ Order cancelled.\n\nNo worries! You can place a new order anytime.").with_keyboard(vec![
        vec![CallbackAction::Buy.button("🛒 Place New Order")],
        vec![CallbackAction::BackToMenu.button("🏠 Main Menu")],
    ])
}
