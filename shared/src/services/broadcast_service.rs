//! Vendor broadcasts: short announcements fanned out to every chat
//! subscribed to the vendor's bot link.

use chrono::{DateTime, Utc};
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, QueryOrder, Set};

use super::ServiceContext;
use crate::domain::BroadcastType;
use crate::entity::broadcast_messages;
use crate::error::{VendoraError, VendoraResult};
use crate::models::{BroadcastReport, NewBroadcast};
use crate::repositories::BotUserRepository;
use crate::telegram::{send_best_effort, OutboundMessage};

const MAX_TITLE_CHARS: usize = 100;

pub struct BroadcastService {
    ctx: ServiceContext,
    bot_users: BotUserRepository,
}

impl BroadcastService {
    pub fn new(ctx: ServiceContext) -> Self {
        let bot_users = BotUserRepository::new(ctx.db.clone());
        Self { ctx, bot_users }
    }

    pub async fn create(&self, vendor_id: i32, input: NewBroadcast) -> VendoraResult<broadcast_messages::Model> {
        let title = input.title.trim().to_string();
        let content = input.content.trim().to_string();
        if title.is_empty() {
            return Err(VendoraError::validation("Title is required."));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(VendoraError::validation(format!(
                "Title must be at most {} characters.",
                MAX_TITLE_CHARS
            )));
        }
        if content.is_empty() {
            return Err(VendoraError::validation("Content is required."));
        }
        let broadcast = broadcast_messages::ActiveModel {
            vendor_id: Set(vendor_id),
            message_type: Set(input.message_type.unwrap_or(BroadcastType::General).as_str().to_string()),
            title: Set(title),
            content: Set(content),
            is_sent: Set(false),
            sent_at: Set(None),
            sent_count: Set(0),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.ctx.db.as_ref())
        .await?;
        tracing::info!(vendor_id, broadcast_id = broadcast.id, "broadcast drafted");
        Ok(broadcast)
    }

    /// Newest first.
    pub async fn list(&self, vendor_id: i32) -> VendoraResult<Vec<broadcast_messages::Model>> {
        Ok(broadcast_messages::Entity::find()
            .filter(broadcast_messages::Column::VendorId.eq(vendor_id))
            .order_by_desc(broadcast_messages::Column::CreatedAt)
            .order_by_desc(broadcast_messages::Column::Id)
            .all(self.ctx.db.as_ref())
            .await?)
    }

    /// A broadcast owned by `vendor_id`. Other vendors' rows are reported
    /// as missing.
    pub async fn get(&self, vendor_id: i32, id: i32) -> VendoraResult<broadcast_messages::Model> {
        broadcast_messages::Entity::find_by_id(id)
            .filter(broadcast_messages::Column::VendorId.eq(vendor_id))
            .one(self.ctx.db.as_ref())
            .await?
            .ok_or_else(|| VendoraError::not_found("Broadcast"))
    }

    pub async fn delete(&self, vendor_id: i32, id: i32) -> VendoraResult<()> {
        let broadcast = self.get(vendor_id, id).await?;
        broadcast_messages::Entity::delete_by_id(broadcast.id)
            .exec(self.ctx.db.as_ref())
            .await?;
        Ok(())
    }

    /// Sends a broadcast to the vendor's subscribed chats. A broadcast goes
    /// out at most once; it is claimed before the first message leaves and
    /// released again if no chat received it.
    pub async fn send(
        &self,
        vendor_id: i32,
        id: i32,
    ) -> VendoraResult<(broadcast_messages::Model, BroadcastReport)> {
        let broadcast = self.get(vendor_id, id).await?;
        if broadcast.is_sent {
            return Err(VendoraError::InvalidTransition("Message already sent to bot".to_string()));
        }
        let subscribers = self.bot_users.subscribers_of(vendor_id).await?;
        if subscribers.is_empty() {
            return Err(VendoraError::validation("No subscribed customers to send to."));
        }

        let now = Utc::now();
        if !self.mark_sent(broadcast.id, Some(now)).await? {
            return Err(VendoraError::InvalidTransition("Message already sent to bot".to_string()));
        }

        let text = broadcast.as_text();
        let mut report = BroadcastReport {
            recipients: subscribers.len() as u64,
            delivered: 0,
        };
        for user in &subscribers {
            if send_best_effort(self.ctx.telegram.as_ref(), OutboundMessage::text(user.chat_id, text.clone())).await {
                report.delivered += 1;
            }
        }

        if report.delivered == 0 {
            self.release(broadcast.id).await?;
            tracing::warn!(vendor_id, broadcast_id = broadcast.id, "broadcast reached no chats");
            return Err(VendoraError::Internal("Failed to send message to bot".to_string()));
        }
        broadcast_messages::Entity::update_many()
            .col_expr(broadcast_messages::Column::SentCount, Expr::value(report.delivered as i32))
            .filter(broadcast_messages::Column::Id.eq(broadcast.id))
            .exec(self.ctx.db.as_ref())
            .await?;
        tracing::info!(
            vendor_id,
            broadcast_id = broadcast.id,
            delivered = report.delivered,
            recipients = report.recipients,
            "broadcast sent"
        );
        let broadcast = self.get(vendor_id, broadcast.id).await?;
        Ok((broadcast, report))
    }

    /// Flips `is_sent` from false to true. Returns false when another send
    /// got there first.
    async fn mark_sent(&self, id: i32, at: Option<DateTime<Utc>>) -> VendoraResult<bool> {
        let claimed = broadcast_messages::Entity::update_many()
            .col_expr(broadcast_messages::Column::IsSent, Expr::value(true))
            .col_expr(broadcast_messages::Column::SentAt, Expr::value(at))
            .filter(broadcast_messages::Column::Id.eq(id))
            .filter(broadcast_messages::Column::IsSent.eq(false))
            .exec(self.ctx.db.as_ref())
            .await?;
        Ok(claimed.rows_affected == 1)
    }

    async fn release(&self, id: i32) -> VendoraResult<()> {
        broadcast_messages::Entity::update_many()
            .col_expr(broadcast_messages::Column::IsSent, Expr::value(false))
            .col_expr(broadcast_messages::Column::SentAt, Expr::value(Option::<DateTime<Utc>>::None))
            .filter(broadcast_messages::Column::Id.eq(id))
            .exec(self.ctx.db.as_ref())
            .await?;
        Ok(())
    }
}
