use anyhow::Result;
use shared::domain::{OrderStatus, TransactionStatus};
use shared::entity::orders;
use shared::media::{self, PROOFS_DIR};
use shared::VendoraError;
use tracing::{info, warn};

use super::start::contact_button;
use super::{explain, main_menu_row, Reply};
use crate::state::{AppState, ConversationState, Event, Session};

const ORDER_NOT_FOUND: &str = "Order not found. Please check the ID/Code and try again.";

/// The order, if it was placed from this chat.
async fn customer_order(app: &AppState, session: &Session, order_id: i32) -> Result<Option<orders::Model>> {
    match app.services.orders.get(order_id).await {
        Ok(order) if order.customer_chat_id == Some(session.chat_id()) => Ok(Some(order)),
        Ok(_) | Err(VendoraError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn is_open_for_proof(order: &orders::Model) -> bool {
    matches!(order.status(), OrderStatus::Accepted | OrderStatus::Completed)
}

/// Shared by both continue buttons on the acceptance message.
async fn continue_prompt(
    app: &AppState,
    session: &mut Session,
    order_id: i32,
    event: Event,
    lead: &str,
    ask: &str,
) -> Result<Reply> {
    let Some(order) = customer_order(app, session, order_id).await? else {
        return Ok(Reply::text(ORDER_NOT_FOUND));
    };
    if !is_open_for_proof(&order) {
        return Ok(Reply::text(
            "The vendor hasn't accepted your order yet. You'll be notified when it's accepted.",
        ));
    }
    let vendor = app.services.vendors.get(order.vendor_id).await?;
    let stats = app.services.vendors.trust_stats(vendor.id).await?;
    session.apply(event);

    let mut keyboard = Vec::new();
    if let Some(contact) = contact_button(&vendor) {
        keyboard.push(vec![contact]);
    }
    keyboard.extend(main_menu_row());
    Ok(Reply::text(format!(
        "{lead}{name} has accepted your order. {name} has completed {trades} successful trades here.\n{ask}",
        lead = lead,
        name = vendor.name,
        trades = stats.completed_trades,
        ask = ask
    ))
    .with_keyboard(keyboard))
}

pub async fn handle_continue_upload(app: &AppState, session: &mut Session, order_id: i32) -> Result<Reply> {
    continue_prompt(
        app,
        session,
        order_id,
        Event::UploadProof { order_id },
        "",
        "Please upload your payment/on-chain proof now (image or document).",
    )
    .await
}

pub async fn handle_continue_receiving(app: &AppState, session: &mut Session, order_id: i32) -> Result<Reply> {
    continue_prompt(
        app,
        session,
        order_id,
        Event::EnterReceiving { order_id },
        "Great! ",
        "Please enter your receiving details (bank account or wallet address).",
    )
    .await
}

/// A photo or document. Only counts as proof while one is expected.
pub async fn handle_file(
    app: &AppState,
    session: &mut Session,
    file_id: &str,
    file_name: Option<&str>,
) -> Result<Reply> {
    let ConversationState::AwaitingProof { order_id } = session.state else {
        return Ok(Reply::text(
            "Thanks for the file. If this is a payment proof, please create an order first.",
        ));
    };
    let Some(order) = customer_order(app, session, order_id).await? else {
        session.apply(Event::Reset);
        return Ok(Reply::text(ORDER_NOT_FOUND));
    };
    if !is_open_for_proof(&order) {
        return Ok(Reply::text(
            "The vendor hasn't accepted your order yet. Please wait for acceptance before uploading proof.",
        ));
    }

    let relative = media::new_relative_path(PROOFS_DIR, file_name.unwrap_or("proof.jpg"));
    let dest = media::absolute(&app.config().media_root, &relative);
    if let Err(e) = app.services.telegram().download(file_id, &dest).await {
        warn!(chat_id = session.chat_id(), "proof download failed: {}", e);
        return Ok(Reply::text("❌ Couldn't download the file. Please send it again."));
    }
    if let Err(e) = app.services.transactions.attach_proof(&order, &relative).await {
        return explain(e);
    }
    info!(chat_id = session.chat_id(), "proof stored for order {}", order.order_code);
    session.apply(Event::ProofReceived);
    Ok(Reply::text(format!(
        "✅ Proof received for Order ID: {}.\nNow, please enter your receiving details (bank account or wallet address).",
        order.order_code
    )))
}

pub async fn handle_receiving_input(
    app: &AppState,
    session: &mut Session,
    order_id: i32,
    text: &str,
) -> Result<Reply> {
    if text.trim().is_empty() {
        return Ok(Reply::text(
            "Please enter your receiving details (bank account or wallet address).",
        ));
    }
    let txn = match app.services.transactions.set_receiving_details(order_id, text).await {
        Ok(txn) => txn,
        Err(e) => {
            session.apply(Event::Reset);
            return explain(e);
        }
    };

    let order = app.services.orders.get(order_id).await?;
    let vendor = app.services.vendors.get(order.vendor_id).await?;
    // Auto-accepting vendors never saw this order, so tell them once it has everything
    if vendor.auto_accept
        && txn.status() == TransactionStatus::Uncompleted
        && app.services.transactions.mark_vendor_notified(txn.id).await?
    {
        app.services
            .notifications
            .notify_vendor(
                vendor.id,
                "Uncompleted transaction",
                &format!(
                    "Order {} has payment proof and receiving details waiting for you.",
                    order.order_code
                ),
            )
            .await;
    }

    session.apply(Event::ReceivingEntered);
    Ok(Reply::text(
        "Got it. If you have any other information to share with the vendor (optional), type it now. If not, send 'skip'.",
    ))
}

pub async fn handle_note_input(app: &AppState, session: &mut Session, order_id: i32, text: &str) -> Result<Reply> {
    let note = text.trim();
    if !note.is_empty() && !note.eq_ignore_ascii_case("skip") {
        app.services.transactions.set_customer_note(order_id, note).await?;
    }
    session.apply(Event::NoteEntered);
    session.record.temp_order_id = None;
    Ok(Reply::text(
        "✅ Thanks! Your transaction details have been sent to the vendor. You'll be notified when it's processed.",
    )
    .with_keyboard(main_menu_row()))
}
