use anyhow::Result;
use askama::Template;
use chrono::Utc;
use shared::entity::vendors;
use shared::gating;
use shared::templates::WelcomeMessage;
use shared::{Button, Keyboard};
use teloxide::utils::command::BotCommands;
use tracing::info;

use super::{linked_vendor, main_menu_row, Command, Reply};
use crate::callback::CallbackAction;
use crate::state::{AppState, Event, Session};

const VENDOR_PROMPT: &str = "Please send the vendor's username, ID, or code to link this chat to that vendor.";
const BIO_PREVIEW_CHARS: usize = 140;

fn possessive(name: &str) -> String {
    if name.ends_with('s') || name.ends_with('S') {
        format!("{}'", name)
    } else {
        format!("{}'s", name)
    }
}

fn telegram_handle(vendor: &vendors::Model) -> Option<&str> {
    vendor
        .telegram_username
        .as_deref()
        .map(|h| h.trim().trim_start_matches('@'))
        .filter(|h| !h.is_empty())
}

pub(crate) fn contact_button(vendor: &vendors::Model) -> Option<Button> {
    telegram_handle(vendor).map(|handle| Button::url("📨 Contact Vendor", format!("https://t.me/{}", handle)))
}

pub fn main_menu(vendor: Option<&vendors::Model>) -> Keyboard {
    let mut rows = vec![vec![
        CallbackAction::Buy.button("🛒 Buy"),
        CallbackAction::Sell.button("💰 Sell"),
    ]];
    if let Some(contact) = vendor.and_then(contact_button) {
        rows.push(vec![contact]);
    }
    rows.push(vec![
        CallbackAction::CheckOrder.button("📊 Check Order Status"),
        CallbackAction::Help.button("❓ Help"),
    ]);
    rows.push(vec![CallbackAction::SwitchVendor.button("🔁 Switch Vendor")]);
    rows
}

async fn welcome(app: &AppState, vendor: Option<&vendors::Model>) -> Result<Reply> {
    let text = match vendor {
        Some(vendor) => {
            let stats = app.services.vendors.trust_stats(vendor.id).await?;
            WelcomeMessage {
                possessive: Some(possessive(&vendor.name)),
                vendor_name: &vendor.name,
                completed_trades: stats.completed_trades,
                typical_release_minutes: stats.typical_release_minutes,
                bio: vendor
                    .bio
                    .as_deref()
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .map(|b| b.chars().take(BIO_PREVIEW_CHARS).collect()),
            }
            .render()?
        }
        None => WelcomeMessage {
            possessive: None,
            vendor_name: "",
            completed_trades: 0,
            typical_release_minutes: None,
            bio: None,
        }
        .render()?,
    };
    Ok(Reply::text(text).with_keyboard(main_menu(vendor)))
}

/// `/start [vendor_<code>]`: resets the conversation and links the chat to
/// the vendor named in the deep link when that vendor may trade.
pub async fn handle_start(app: &AppState, session: &mut Session, arg: &str) -> Result<Reply> {
    let chat_id = session.chat_id();
    info!(chat_id, "processing /start");
    session.clear();

    let mut vendor = linked_vendor(app, session).await?;
    let token = arg
        .trim()
        .strip_prefix("vendor_")
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = token {
        match app.services.vendors.resolve(token).await? {
            Some(found) => {
                if let Err(denial) = gating::check_service(&found, Utc::now()) {
                    info!(chat_id, vendor_id = found.id, "start link refused: {:?}", denial);
                    return Ok(Reply::text(denial.customer_message()));
                }
                session.user = app
                    .services
                    .sessions
                    .link_vendor(session.user.clone(), Some(found.id), true)
                    .await?;
                info!(chat_id, vendor_id = found.id, "chat linked from start link");
                vendor = Some(found);
            }
            None => info!(chat_id, "start token {:?} matched no vendor", token),
        }
    }
    if !session.user.is_subscribed {
        session.user = app
            .services
            .sessions
            .link_vendor(session.user.clone(), session.vendor_id(), true)
            .await?;
    }

    match vendor {
        Some(vendor) => welcome(app, Some(&vendor)).await,
        None => {
            session.apply(Event::AskVendor);
            Ok(Reply::text(VENDOR_PROMPT))
        }
    }
}

pub async fn handle_menu(app: &AppState, session: &mut Session) -> Result<Reply> {
    session.apply(Event::Reset);
    let vendor = linked_vendor(app, session).await?;
    welcome(app, vendor.as_ref()).await
}

pub async fn handle_help(app: &AppState, session: &Session) -> Result<Reply> {
    let intro = match linked_vendor(app, session).await? {
        Some(vendor) => format!("You're chatting with {} Vendora bot.", possessive(&vendor.name)),
        None => "This bot connects you with your vendor on Vendora.".to_string(),
    };
    let text = format!("{}\n\n{}", intro, Command::descriptions());
    Ok(Reply::text(text).with_keyboard(main_menu_row()))
}

pub fn handle_switch_vendor(session: &mut Session) -> Reply {
    session.apply(Event::AskVendor);
    Reply::text(VENDOR_PROMPT)
}

/// Typed vendor reference while waiting for one.
pub async fn handle_vendor_reference(app: &AppState, session: &mut Session, text: &str) -> Result<Reply> {
    let token = text.trim().trim_start_matches('@');
    let Some(vendor) = app.services.vendors.resolve(token).await? else {
        return Ok(Reply::text(
            "Couldn't find that vendor. Please check the username/ID and try again.",
        ));
    };
    session.user = app
        .services
        .sessions
        .link_vendor(session.user.clone(), Some(vendor.id), true)
        .await?;
    session.apply(Event::VendorLinked);
    info!(chat_id = session.chat_id(), vendor_id = vendor.id, "chat switched vendor");
    Ok(Reply::text("Linked to vendor successfully. Use /help to see available commands.")
        .with_keyboard(main_menu(Some(&vendor))))
}

pub fn handle_status() -> Reply {
    Reply::text("Bot is running and connected to Vendora PWA!")
}

pub async fn handle_cancel(app: &AppState, session: &mut Session) -> Result<Reply> {
    session.clear();
    let vendor = linked_vendor(app, session).await?;
    Ok(Reply::text("Cancelled. Use /help to see available commands.").with_keyboard(main_menu(vendor.as_ref())))
}
