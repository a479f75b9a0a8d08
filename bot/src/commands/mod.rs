use anyhow::Result;
use shared::domain::OrderType;
use shared::entity::vendors;
use shared::{Keyboard, OutboundMessage, VendoraError};
use teloxide::utils::command::BotCommands;

use crate::callback::CallbackAction;
use crate::state::{AppState, ConversationState, Session};

pub mod proof;
pub mod start;
pub mod support;
pub mod trade;

pub use proof::handle_file;

/// Vendora bot commands:
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    /// Start the bot or open a vendor link
    Start(String),
    /// Show this help
    Help,
    /// Link this chat to a different vendor
    SwitchVendor,
    /// Check that the bot is online
    Status,
    /// List the assets you can trade
    Assets,
    /// Show the rate for an asset, e.g. /rate USDT
    Rate(String),
    /// Ask the vendor a question
    Query(String),
    /// Cancel the current step
    Cancel,
}

/// What the bot says back to one update.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn into_message(self, chat_id: i64) -> OutboundMessage {
        OutboundMessage::text(chat_id, self.text).with_keyboard(self.keyboard)
    }
}

pub(crate) fn main_menu_row() -> Keyboard {
    vec![vec![CallbackAction::BackToMenu.button("🏠 Main Menu")]]
}

/// Customer-facing text for a service error. Storage failures propagate.
pub(crate) fn explain(err: VendoraError) -> Result<Reply> {
    match err {
        VendoraError::Gated(denial) => Ok(Reply::text(denial.customer_message())),
        VendoraError::Database(_) | VendoraError::Internal(_) => Err(err.into()),
        other => Ok(Reply::text(other.to_string())),
    }
}

/// The vendor this chat is linked to, if it still exists.
pub(crate) async fn linked_vendor(app: &AppState, session: &Session) -> Result<Option<vendors::Model>> {
    let Some(vendor_id) = session.vendor_id() else {
        return Ok(None);
    };
    match app.services.vendors.get(vendor_id).await {
        Ok(vendor) => Ok(Some(vendor)),
        Err(VendoraError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parses `/command args`, tolerating a `@bot` mention on the command.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let (head, args) = match text.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (text, ""),
    };
    let name = match head.split_once('@') {
        Some((name, mention)) => {
            if bot_username.is_some_and(|u| !u.eq_ignore_ascii_case(mention)) {
                return None;
            }
            name
        }
        None => head,
    };
    let normalised = if args.is_empty() {
        name.to_lowercase()
    } else {
        format!("{} {}", name.to_lowercase(), args)
    };
    Command::parse(&normalised, bot_username.unwrap_or(""))
        .or_else(|_| Command::parse(&name.to_lowercase(), bot_username.unwrap_or("")))
        .ok()
}

pub async fn handle_command(app: &AppState, session: &mut Session, command: Command) -> Result<Reply> {
    tracing::info!(chat_id = session.chat_id(), "command {:?}", command);
    match command {
        Command::Start(arg) => start::handle_start(app, session, &arg).await,
        Command::Help => start::handle_help(app, session).await,
        Command::SwitchVendor => Ok(start::handle_switch_vendor(session)),
        Command::Status => Ok(start::handle_status()),
        Command::Cancel => start::handle_cancel(app, session).await,
        Command::Assets => support::handle_assets(app, session).await,
        Command::Rate(asset) => support::handle_rate(app, session, &asset).await,
        Command::Query(text) => support::handle_query_command(app, session, &text).await,
    }
}

/// Plain text: a command, or input for whatever the conversation is waiting on.
pub async fn handle_text(app: &AppState, session: &mut Session, text: &str) -> Result<Reply> {
    if text.starts_with('/') {
        if let Some(command) = parse_command(text, app.bot_username.as_deref()) {
            return handle_command(app, session, command).await;
        }
    }
    match session.state.clone() {
        ConversationState::Idle => Ok(Reply::text("I received your message. Use /help to see commands.")),
        ConversationState::AwaitingVendor => start::handle_vendor_reference(app, session, text).await,
        ConversationState::AwaitingAmount { asset, order_type } => {
            trade::handle_amount_input(app, session, &asset, order_type, text).await
        }
        ConversationState::AwaitingProof { .. } => Ok(Reply::text(
            "Please upload your payment/on-chain proof as an image or document.",
        )),
        ConversationState::AwaitingReceiving { order_id } => {
            proof::handle_receiving_input(app, session, order_id, text).await
        }
        ConversationState::AwaitingNote { order_id } => proof::handle_note_input(app, session, order_id, text).await,
        ConversationState::AwaitingOrderStatus => support::handle_order_reference(app, session, text).await,
        ConversationState::AwaitingGeneralQuestion => support::handle_question_input(app, session, text).await,
        ConversationState::AwaitingContact { query_id } => {
            support::handle_contact_input(app, session, query_id, text).await
        }
    }
}

pub async fn handle_callback(
    app: &AppState,
    session: &mut Session,
    data: &str,
    from_name: Option<&str>,
) -> Result<Reply> {
    let action = CallbackAction::parse(data);
    tracing::debug!(chat_id = session.chat_id(), "callback {:?}", action);
    match action {
        CallbackAction::Buy => trade::handle_trade_menu(app, session, OrderType::Buy).await,
        CallbackAction::Sell => trade::handle_trade_menu(app, session, OrderType::Sell).await,
        CallbackAction::Query => Ok(support::handle_query_menu()),
        CallbackAction::Help => start::handle_help(app, session).await,
        CallbackAction::Assets => support::handle_assets(app, session).await,
        CallbackAction::Asset { order_type, asset } => trade::handle_asset(app, session, &asset, order_type).await,
        CallbackAction::Continue { asset, order_type } => Ok(trade::handle_continue(session, &asset, order_type)),
        CallbackAction::CancelAmount => trade::handle_cancel_amount(app, session).await,
        CallbackAction::Amount {
            asset,
            order_type,
            amount,
        }
        | CallbackAction::Repeat {
            asset,
            order_type,
            amount,
        } => trade::handle_preview(app, session, &asset, order_type, amount).await,
        CallbackAction::Confirm {
            asset,
            order_type,
            amount,
            vendor_id,
        } => {
            let order = trade::OrderRequest {
                asset,
                order_type,
                amount,
                vendor_id,
            };
            trade::handle_confirm(app, session, order, from_name).await
        }
        CallbackAction::CancelOrder => Ok(trade::handle_cancel_order(session)),
        CallbackAction::CheckOrder => Ok(support::handle_check_order(session)),
        CallbackAction::GeneralQuestion => Ok(support::handle_general_question(session)),
        CallbackAction::BackToMenu => start::handle_menu(app, session).await,
        CallbackAction::SwitchVendor => Ok(start::handle_switch_vendor(session)),
        CallbackAction::ContinueReceiving(order_id) => proof::handle_continue_receiving(app, session, order_id).await,
        CallbackAction::ContinueUpload(order_id) => proof::handle_continue_upload(app, session, order_id).await,
        CallbackAction::ContactVendor(handle) => Ok(Reply::text(format!(
            "You can contact the vendor directly here: https://t.me/{}",
            handle
        ))),
        CallbackAction::Unknown(data) => {
            tracing::debug!(chat_id = session.chat_id(), "unknown callback data {:?}", data);
            Ok(Reply::text("Unknown action. Please try again."))
        }
    }
}
