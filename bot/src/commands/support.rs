use anyhow::Result;
use askama::Template;
use shared::entity::rates;
use shared::templates::{format_amount, format_money, format_timestamp, OrderStatusMessage};
use shared::VendoraError;

use super::{explain, linked_vendor, main_menu_row, Reply};
use crate::callback::CallbackAction;
use crate::state::{AppState, Event, Session};

const RATES_ACROSS_VENDORS: u64 = 5;

pub fn handle_query_menu() -> Reply {
    Reply::text("What type of query do you have?").with_keyboard(vec![
        vec![CallbackAction::CheckOrder.button("📊 Check Order Status")],
        vec![CallbackAction::GeneralQuestion.button("❓ General Question")],
        vec![CallbackAction::BackToMenu.button("🏠 Main Menu")],
    ])
}

pub fn handle_check_order(session: &mut Session) -> Reply {
    session.apply(Event::CheckOrder);
    Reply::text("Please enter your Order ID or Code (e.g., ORD-..., or a numeric ID).").with_keyboard(main_menu_row())
}

pub async fn handle_order_reference(app: &AppState, session: &mut Session, text: &str) -> Result<Reply> {
    session.apply(Event::StatusAnswered);
    let Some(order) = app
        .services
        .orders
        .find_by_reference(session.vendor_id(), text)
        .await?
    else {
        return Ok(Reply::text("Order not found. Please check the ID/Code and try again."));
    };
    let txn = app.services.transactions.for_order(order.id).await?;
    let text = OrderStatusMessage {
        order_code: &order.order_code,
        order_type: order.order_type().label(),
        asset: &order.asset,
        amount: format_amount(order.amount),
        total: format_money(order.total_value),
        status: &order.status,
        accepted_at: order.accepted_at.map(format_timestamp),
        declined_at: order.declined_at.map(format_timestamp),
        completed_at: txn.as_ref().and_then(|t| t.completed_at).map(format_timestamp),
        proof_uploaded_at: txn.as_ref().and_then(|t| t.proof_uploaded_at).map(format_timestamp),
        transaction_created_at: txn.as_ref().map(|t| format_timestamp(t.created_at)),
    }
    .render()?;
    Ok(Reply::text(text).with_keyboard(main_menu_row()))
}

pub fn handle_general_question(session: &mut Session) -> Reply {
    session.apply(Event::AskQuestion);
    Reply::text("Please type your question. After that, I'll ask for your contact so the vendor can reach you.")
}

pub async fn handle_question_input(app: &AppState, session: &mut Session, text: &str) -> Result<Reply> {
    let query = match app
        .services
        .queries
        .create_from_bot(session.vendor_id(), None, session.chat_id(), text)
        .await
    {
        Ok(query) => query,
        Err(e) => return explain(e),
    };
    session.apply(Event::QuestionEntered { query_id: query.id });
    Ok(Reply::text(
        "Thanks! Please share your contact (phone/email/Telegram handle) so the vendor can reach you.",
    ))
}

pub async fn handle_contact_input(app: &AppState, session: &mut Session, query_id: i32, text: &str) -> Result<Reply> {
    if text.trim().is_empty() {
        return Ok(Reply::text(
            "Please share your contact (phone/email/Telegram handle) so the vendor can reach you.",
        ));
    }
    match app.services.queries.set_contact(query_id, text, session.chat_id()).await {
        Ok(_) => {}
        Err(VendoraError::NotFound(_)) => {
            session.apply(Event::Reset);
            session.record.temp_query_id = None;
            return Ok(Reply::text("That question is no longer open. Please ask it again."));
        }
        Err(e) => return explain(e),
    }
    session.apply(Event::ContactEntered);
    session.record.temp_query_id = None;
    Ok(Reply::text(
        "✅ Got it! The vendor has received your question and contact. They'll reach out to you soon.",
    )
    .with_keyboard(main_menu_row()))
}

/// `/query [text]`: with text the question is recorded right away.
pub async fn handle_query_command(app: &AppState, session: &mut Session, text: &str) -> Result<Reply> {
    let reply = handle_general_question(session);
    if text.trim().is_empty() {
        return Ok(reply);
    }
    handle_question_input(app, session, text).await
}

pub async fn handle_assets(app: &AppState, session: &Session) -> Result<Reply> {
    let vendor = linked_vendor(app, session).await?;
    let assets = app.services.rates.assets(vendor.map(|v| v.id)).await?;
    if assets.is_empty() {
        return Ok(Reply::text("No assets available yet."));
    }
    Ok(Reply::text(format!("Available assets:\n{}", assets.join("\n"))))
}

fn rate_line(vendor_name: &str, rate: &rates::Model) -> String {
    format!(
        "{}: Buy ₦{} | Sell ₦{}",
        vendor_name,
        format_money(rate.buy_rate),
        format_money(rate.sell_rate)
    )
}

pub async fn handle_rate(app: &AppState, session: &Session, arg: &str) -> Result<Reply> {
    let asset = arg.trim().to_uppercase();
    if asset.is_empty() {
        return Ok(Reply::text("Usage: /rate ASSET_SYMBOL"));
    }
    let found: Vec<rates::Model> = match session.vendor_id() {
        Some(vendor_id) => app.services.rates.find(vendor_id, &asset).await?.into_iter().collect(),
        None => app.services.rates.for_asset(&asset, RATES_ACROSS_VENDORS).await?,
    };
    if found.is_empty() {
        return Ok(Reply::text(format!("No rate found for {}.", asset)));
    }
    let mut lines = vec![format!("{} rates:", asset)];
    for rate in &found {
        let name = match app.services.vendors.get(rate.vendor_id).await {
            Ok(vendor) => vendor.name,
            Err(VendoraError::NotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        };
        lines.push(rate_line(&name, rate));
    }
    Ok(Reply::text(lines.join("\n")))
}
