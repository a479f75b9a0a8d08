#![allow(dead_code)]

use bot::{AppState, Inbound, InboundKind, Router};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Database, IntoActiveModel};
use shared::entity::{bot_users, rates, vendors};
use shared::models::RateInput;
use shared::telegram::ButtonKind;
use shared::{Cache, Config, OutboundMessage, RecordingTelegram, ServiceContext, Services};
use std::sync::Arc;

pub const CHAT: i64 = 5551;

pub struct BotEnv {
    pub router: Router,
    pub services: Services,
    pub telegram: Arc<RecordingTelegram>,
}

pub async fn setup() -> BotEnv {
    let mut config = Config::default();
    config.password_hash_cost = 4;
    config.bot_username = Some("VendoraBot".to_string());
    config.media_root = std::env::temp_dir()
        .join(format!("vendora-bot-test-{}", uuid::Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();

    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let telegram = Arc::new(RecordingTelegram::new());
    let ctx = ServiceContext {
        db: Arc::new(db),
        config: Arc::new(config),
        telegram: telegram.clone(),
        cache: Arc::new(Cache::memory()),
    };
    let services = Services::new(ctx);
    let router = Router::new(Arc::new(AppState::new(services.clone())));
    BotEnv {
        router,
        services,
        telegram,
    }
}

async fn deliver(env: &BotEnv, kind: InboundKind) -> Vec<OutboundMessage> {
    env.telegram.clear();
    env.router
        .handle(Inbound {
            chat_id: CHAT,
            from_name: Some("Bola".to_string()),
            kind,
        })
        .await
        .unwrap();
    env.telegram.sent_to(CHAT)
}

/// Sends a text message and returns the last reply to the chat.
pub async fn say(env: &BotEnv, text: &str) -> OutboundMessage {
    let sent = deliver(env, InboundKind::Text(text.to_string())).await;
    sent.last().cloned().expect("bot replied")
}

pub async fn press(env: &BotEnv, data: &str) -> OutboundMessage {
    let sent = deliver(
        env,
        InboundKind::Callback {
            id: "cb".to_string(),
            data: data.to_string(),
        },
    )
    .await;
    sent.last().cloned().expect("bot replied")
}

pub async fn upload(env: &BotEnv, file_id: &str, file_name: &str) -> OutboundMessage {
    let sent = deliver(
        env,
        InboundKind::File {
            file_id: file_id.to_string(),
            file_name: Some(file_name.to_string()),
        },
    )
    .await;
    sent.last().cloned().expect("bot replied")
}

pub async fn session(env: &BotEnv) -> bot_users::Model {
    env.services.sessions.find(CHAT).await.unwrap().expect("session exists")
}

pub fn callbacks(message: &OutboundMessage) -> Vec<String> {
    message
        .keyboard
        .iter()
        .flatten()
        .flatten()
        .filter_map(|b| match &b.kind {
            ButtonKind::Callback(data) => Some(data.clone()),
            ButtonKind::Url(_) => None,
        })
        .collect()
}

pub async fn vendor(env: &BotEnv, email: &str, name: &str) -> vendors::Model {
    env.services.vendors.signup(email, name, "password123").await.unwrap()
}

pub async fn update_vendor(
    env: &BotEnv,
    vendor: vendors::Model,
    f: impl FnOnce(&mut vendors::ActiveModel),
) -> vendors::Model {
    let mut active = vendor.into_active_model();
    f(&mut active);
    active.update(env.services.db()).await.unwrap()
}

pub async fn rate(env: &BotEnv, vendor_id: i32, asset: &str, buy: i64, sell: i64) -> rates::Model {
    env.services
        .rates
        .create(
            vendor_id,
            RateInput {
                asset: asset.to_string(),
                buy_rate: Decimal::from(buy),
                sell_rate: Decimal::from(sell),
                contract_address: Some("0xVendorWallet".to_string()),
                bank_details: Some("Zenith 0123456789".to_string()),
            },
        )
        .await
        .unwrap()
}

/// Links the test chat to `vendor` through a deep link.
pub async fn link(env: &BotEnv, vendor: &vendors::Model) {
    say(env, &format!("/start vendor_{}", vendor.id)).await;
}
