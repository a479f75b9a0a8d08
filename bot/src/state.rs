use rust_decimal::Decimal;
use shared::domain::OrderType;
use shared::entity::bot_users;
use shared::services::session_service::SessionRecord;
use shared::{Config, Services};
use std::sync::Arc;

/// Everything a handler needs: the shared services plus the bot's own
/// identity.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub bot_name: String,
    /// `@username` without the `@`, used to match `/cmd@bot` mentions.
    pub bot_username: Option<String>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        let bot_name = services.config().bot_name.clone();
        let bot_username = services.config().bot_username.clone();
        Self {
            services,
            bot_name,
            bot_username,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        if username.is_some() {
            self.bot_username = username;
        }
        self
    }

    pub fn config(&self) -> &Config {
        self.services.config()
    }
}

pub type SharedState = Arc<AppState>;

/// Where a chat is in its conversation with the bot.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingVendor,
    AwaitingAmount { asset: String, order_type: OrderType },
    AwaitingProof { order_id: i32 },
    AwaitingReceiving { order_id: i32 },
    AwaitingNote { order_id: i32 },
    AwaitingOrderStatus,
    AwaitingGeneralQuestion,
    AwaitingContact { query_id: i32 },
}

/// Something that happened in the chat and may move the conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// /start, /cancel, main menu, or an expired session.
    Reset,
    AskVendor,
    VendorLinked,
    ChooseAmount { asset: String, order_type: OrderType },
    CancelAmount,
    AmountEntered,
    OrderAutoAccepted { order_id: i32 },
    UploadProof { order_id: i32 },
    ProofReceived,
    EnterReceiving { order_id: i32 },
    ReceivingEntered,
    NoteEntered,
    CheckOrder,
    StatusAnswered,
    AskQuestion,
    QuestionEntered { query_id: i32 },
    ContactEntered,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unexpected {
    pub state: ConversationState,
    pub event: Event,
}

impl std::fmt::Display for Unexpected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} is not expected in state {:?}", self.event, self.state)
    }
}

impl std::error::Error for Unexpected {}

impl ConversationState {
    /// The transition table. Menu buttons may be pressed from any state;
    /// typed input only counts in the state that asked for it.
    pub fn on(&self, event: Event) -> Result<ConversationState, Unexpected> {
        use ConversationState as S;
        let next = match (self, &event) {
            (_, Event::Reset) => S::Idle,
            (_, Event::AskVendor) => S::AwaitingVendor,
            (_, Event::ChooseAmount { asset, order_type }) => S::AwaitingAmount {
                asset: asset.clone(),
                order_type: *order_type,
            },
            (_, Event::OrderAutoAccepted { order_id }) => S::AwaitingProof { order_id: *order_id },
            (_, Event::UploadProof { order_id }) => S::AwaitingProof { order_id: *order_id },
            (_, Event::EnterReceiving { order_id }) => S::AwaitingReceiving { order_id: *order_id },
            (_, Event::CheckOrder) => S::AwaitingOrderStatus,
            (_, Event::AskQuestion) => S::AwaitingGeneralQuestion,

            (S::AwaitingVendor, Event::VendorLinked) => S::Idle,
            (S::AwaitingAmount { .. }, Event::CancelAmount) => S::Idle,
            (S::AwaitingAmount { .. }, Event::AmountEntered) => S::Idle,
            (S::AwaitingProof { order_id }, Event::ProofReceived) => S::AwaitingReceiving { order_id: *order_id },
            (S::AwaitingReceiving { order_id }, Event::ReceivingEntered) => S::AwaitingNote { order_id: *order_id },
            (S::AwaitingNote { .. }, Event::NoteEntered) => S::Idle,
            (S::AwaitingOrderStatus, Event::StatusAnswered) => S::Idle,
            (S::AwaitingGeneralQuestion, Event::QuestionEntered { query_id }) => {
                S::AwaitingContact { query_id: *query_id }
            }
            (S::AwaitingContact { .. }, Event::ContactEntered) => S::Idle,
            _ => {
                return Err(Unexpected {
                    state: self.clone(),
                    event,
                })
            }
        };
        Ok(next)
    }

    pub fn tag(&self) -> Option<&'static str> {
        match self {
            ConversationState::Idle => None,
            ConversationState::AwaitingVendor => Some("awaiting_vendor"),
            ConversationState::AwaitingAmount { .. } => Some("awaiting_amount"),
            ConversationState::AwaitingProof { .. } => Some("awaiting_proof"),
            ConversationState::AwaitingReceiving { .. } => Some("awaiting_receiving"),
            ConversationState::AwaitingNote { .. } => Some("awaiting_note"),
            ConversationState::AwaitingOrderStatus => Some("awaiting_order_status"),
            ConversationState::AwaitingGeneralQuestion => Some("awaiting_general_question"),
            ConversationState::AwaitingContact { .. } => Some("awaiting_contact"),
        }
    }

    /// Reads the persisted form. A tag whose context fields are missing
    /// falls back to `Idle`.
    pub fn decode(record: &SessionRecord) -> Self {
        let order = || record.temp_order_id;
        let decoded = match record.state.as_deref().unwrap_or("") {
            "awaiting_vendor" => Some(ConversationState::AwaitingVendor),
            "awaiting_amount" => match (&record.temp_asset, record.temp_type.as_deref().map(str::parse::<OrderType>)) {
                (Some(asset), Some(Ok(order_type))) if !asset.is_empty() => Some(ConversationState::AwaitingAmount {
                    asset: asset.clone(),
                    order_type,
                }),
                _ => None,
            },
            "awaiting_proof" => order().map(|order_id| ConversationState::AwaitingProof { order_id }),
            "awaiting_receiving" => order().map(|order_id| ConversationState::AwaitingReceiving { order_id }),
            "awaiting_note" => order().map(|order_id| ConversationState::AwaitingNote { order_id }),
            "awaiting_order_status" => Some(ConversationState::AwaitingOrderStatus),
            "awaiting_general_question" => Some(ConversationState::AwaitingGeneralQuestion),
            "awaiting_contact" => record
                .temp_query_id
                .map(|query_id| ConversationState::AwaitingContact { query_id }),
            _ => None,
        };
        decoded.unwrap_or_default()
    }

    /// Writes the state into `record`, keeping unrelated context fields.
    pub fn encode(&self, record: &mut SessionRecord) {
        record.state = self.tag().map(str::to_string);
        match self {
            ConversationState::AwaitingAmount { asset, order_type } => {
                record.temp_asset = Some(asset.clone());
                record.temp_type = Some(order_type.as_str().to_string());
            }
            ConversationState::AwaitingProof { order_id }
            | ConversationState::AwaitingReceiving { order_id }
            | ConversationState::AwaitingNote { order_id } => record.temp_order_id = Some(*order_id),
            ConversationState::AwaitingContact { query_id } => record.temp_query_id = Some(*query_id),
            _ => {}
        }
    }
}

/// One chat's session for the duration of an update.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: bot_users::Model,
    pub record: SessionRecord,
    pub state: ConversationState,
}

impl Session {
    pub fn load(user: bot_users::Model) -> Self {
        let record = SessionRecord::from_model(&user);
        let state = ConversationState::decode(&record);
        Self { user, record, state }
    }

    pub fn chat_id(&self) -> i64 {
        self.user.chat_id
    }

    pub fn vendor_id(&self) -> Option<i32> {
        self.user.vendor_id
    }

    /// Applies `event`; an unexpected event is logged and leaves the
    /// state as it was.
    pub fn apply(&mut self, event: Event) -> bool {
        match self.state.on(event) {
            Ok(next) => {
                self.state = next;
                true
            }
            Err(unexpected) => {
                tracing::debug!(chat_id = self.user.chat_id, "{}", unexpected);
                false
            }
        }
    }

    /// Drops the state and every context field.
    pub fn clear(&mut self) {
        self.state = ConversationState::Idle;
        self.record = SessionRecord::default();
    }

    pub fn remember_order(&mut self, order_id: i32, asset: &str, order_type: OrderType, amount: Decimal) {
        self.record.temp_order_id = Some(order_id);
        self.record.temp_asset = Some(asset.to_string());
        self.record.temp_type = Some(order_type.as_str().to_string());
        self.record.temp_amount = Some(amount);
    }

    /// The record to persist for this session.
    pub fn to_record(&self) -> SessionRecord {
        let mut record = self.record.clone();
        self.state.encode(&mut record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_input_outside_its_state_is_unexpected() {
        let idle = ConversationState::Idle;
        assert!(idle.on(Event::ProofReceived).is_err());
        assert!(idle.on(Event::AmountEntered).is_err());
        assert!(idle.on(Event::CancelAmount).is_err());
        let proof = ConversationState::AwaitingProof { order_id: 4 };
        assert_eq!(
            proof.on(Event::ProofReceived),
            Ok(ConversationState::AwaitingReceiving { order_id: 4 })
        );
        assert!(proof.on(Event::NoteEntered).is_err());
    }

    #[test]
    fn receiving_flow_walks_to_idle() {
        let state = ConversationState::Idle
            .on(Event::EnterReceiving { order_id: 9 })
            .and_then(|s| s.on(Event::ReceivingEntered))
            .unwrap();
        assert_eq!(state, ConversationState::AwaitingNote { order_id: 9 });
        assert_eq!(state.on(Event::NoteEntered), Ok(ConversationState::Idle));
    }

    #[test]
    fn codec_keeps_context_and_rejects_incomplete_tags() {
        let state = ConversationState::AwaitingAmount {
            asset: "USDT".to_string(),
            order_type: OrderType::Sell,
        };
        let mut record = SessionRecord {
            temp_order_id: Some(12),
            ..Default::default()
        };
        state.encode(&mut record);
        assert_eq!(record.state.as_deref(), Some("awaiting_amount"));
        assert_eq!(record.temp_order_id, Some(12));
        assert_eq!(ConversationState::decode(&record), state);

        let broken = SessionRecord {
            state: Some("awaiting_contact".to_string()),
            ..Default::default()
        };
        assert_eq!(ConversationState::decode(&broken), ConversationState::Idle);
        let legacy = SessionRecord {
            state: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(ConversationState::decode(&legacy), ConversationState::Idle);
    }
}
