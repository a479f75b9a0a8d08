pub mod config;
pub mod database;
pub mod domain;
pub mod entity;
pub mod error;
pub mod gating;
pub mod media;
pub mod models;
pub mod order_code;
pub mod redis;
pub mod repositories;
pub mod services;
pub mod telegram;
pub mod templates;

pub use config::Config;
pub use database::get_db_connection;
pub use error::{VendoraError, VendoraResult};
pub use models::*;
pub use redis::{get_redis_client, Cache, Redis};
pub use services::{ServiceContext, Services};
pub use telegram::{Button, ButtonKind, Keyboard, LoggingTelegram, OutboundMessage, RecordingTelegram, TelegramClient};
