use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{IntoActiveModel, Set};

use super::ServiceContext;
use crate::entity::bot_users;
use crate::error::VendoraResult;
use crate::repositories::BotUserRepository;

/// Raw persisted form of a chat's conversation session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    pub state: Option<String>,
    pub temp_type: Option<String>,
    pub temp_asset: Option<String>,
    pub temp_amount: Option<Decimal>,
    pub temp_order_id: Option<i32>,
    pub temp_query_id: Option<i32>,
}

impl SessionRecord {
    pub fn from_model(user: &bot_users::Model) -> Self {
        Self {
            state: user.state.clone(),
            temp_type: user.temp_type.clone(),
            temp_asset: user.temp_asset.clone(),
            temp_amount: user.temp_amount,
            temp_order_id: user.temp_order_id,
            temp_query_id: user.temp_query_id,
        }
    }
}

/// Bot users and their conversation sessions.
pub struct SessionService {
    ctx: ServiceContext,
    repo: BotUserRepository,
}

impl SessionService {
    pub fn new(ctx: ServiceContext) -> Self {
        let repo = BotUserRepository::new(ctx.db.clone());
        Self { ctx, repo }
    }

    pub async fn find(&self, chat_id: i64) -> VendoraResult<Option<bot_users::Model>> {
        Ok(self.repo.find_by_chat_id(chat_id).await?)
    }

    pub async fn get_or_create(&self, chat_id: i64) -> VendoraResult<bot_users::Model> {
        Ok(self.repo.get_or_create(chat_id).await?)
    }

    /// Whether the session has sat untouched past the configured TTL.
    pub fn is_stale(&self, user: &bot_users::Model, now: DateTime<Utc>) -> bool {
        let ttl = Duration::minutes(self.ctx.config.bot_session_ttl_minutes);
        user.state.is_some() && matches!(user.state_updated_at, Some(at) if now - at > ttl)
    }

    pub async fn link_vendor(
        &self,
        user: bot_users::Model,
        vendor_id: Option<i32>,
        subscribed: bool,
    ) -> VendoraResult<bot_users::Model> {
        let mut active = user.into_active_model();
        active.vendor_id = Set(vendor_id);
        active.is_subscribed = Set(subscribed);
        Ok(self.repo.update(active).await?)
    }

    pub async fn save(&self, user: bot_users::Model, record: SessionRecord) -> VendoraResult<bot_users::Model> {
        // An active conversation still counts as touched when nothing changed
        if record.state.is_none() && SessionRecord::from_model(&user) == record {
            return Ok(user);
        }
        let mut active = user.into_active_model();
        active.state_updated_at = Set(record.state.as_ref().map(|_| Utc::now()));
        active.state = Set(record.state);
        active.temp_type = Set(record.temp_type);
        active.temp_asset = Set(record.temp_asset);
        active.temp_amount = Set(record.temp_amount);
        active.temp_order_id = Set(record.temp_order_id);
        active.temp_query_id = Set(record.temp_query_id);
        Ok(self.repo.update(active).await?)
    }

    pub async fn reset_stale(&self, now: DateTime<Utc>) -> VendoraResult<u64> {
        let before = now - Duration::minutes(self.ctx.config.bot_session_ttl_minutes);
        let cleared = self.repo.reset_stale(before).await?;
        if cleared > 0 {
            tracing::info!(cleared, "reset abandoned bot sessions");
        }
        Ok(cleared)
    }

    pub async fn count(&self) -> VendoraResult<u64> {
        Ok(self.repo.count().await?)
    }
}
