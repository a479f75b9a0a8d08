use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::sea_query::Query;
use sea_orm::{ActiveModelTrait, Condition, IntoActiveModel, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;

use super::{NotificationService, ServiceContext};
use crate::domain::QueryStatus;
use crate::entity::{orders, queries};
use crate::error::{VendoraError, VendoraResult};
use crate::telegram::{send_best_effort, OutboundMessage};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryPatch {
    pub reply: Option<String>,
    pub status: Option<String>,
}

/// Customer questions raised from the bot.
pub struct QueryService {
    ctx: ServiceContext,
    notifications: Arc<NotificationService>,
}

impl QueryService {
    pub fn new(ctx: ServiceContext, notifications: Arc<NotificationService>) -> Self {
        Self { ctx, notifications }
    }

    fn scope(vendor_id: i32) -> Condition {
        Condition::any()
            .add(queries::Column::VendorId.eq(vendor_id))
            .add(
                queries::Column::OrderId.in_subquery(
                    Query::select()
                        .column(orders::Column::Id)
                        .from(orders::Entity)
                        .and_where(orders::Column::VendorId.eq(vendor_id))
                        .to_owned(),
                ),
            )
    }

    pub async fn create_from_bot(
        &self,
        vendor_id: Option<i32>,
        order_id: Option<i32>,
        chat_id: i64,
        message: &str,
    ) -> VendoraResult<queries::Model> {
        let message = message.trim();
        if message.is_empty() {
            return Err(VendoraError::validation("Message may not be blank."));
        }
        let query = queries::ActiveModel {
            order_id: Set(order_id),
            vendor_id: Set(vendor_id),
            message: Set(message.to_string()),
            contact: Set(None),
            reply: Set(None),
            status: Set(QueryStatus::Pending.as_str().to_string()),
            customer_chat_id: Set(Some(chat_id)),
            notified_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.ctx.db.as_ref())
        .await?;
        tracing::info!(query_id = query.id, "customer query received");
        Ok(query)
    }

    /// Stores how the customer wants to be reached and tells the vendor.
    pub async fn set_contact(&self, query_id: i32, contact: &str, chat_id: i64) -> VendoraResult<queries::Model> {
        let query = queries::Entity::find_by_id(query_id)
            .one(self.ctx.db.as_ref())
            .await?
            .ok_or_else(|| VendoraError::not_found("Query"))?;
        let mut active = query.into_active_model();
        active.contact = Set(Some(contact.trim().to_string()));
        active.customer_chat_id = Set(Some(chat_id));
        let query = active.update(self.ctx.db.as_ref()).await?;
        if let Some(vendor_id) = query.vendor_id {
            self.notifications
                .notify_vendor(
                    vendor_id,
                    "New customer query",
                    &format!("{} (contact: {})", query.message, contact.trim()),
                )
                .await;
        }
        Ok(query)
    }

    pub async fn list(&self, vendor_id: i32, status: Option<&str>) -> VendoraResult<Vec<queries::Model>> {
        let mut select = queries::Entity::find().filter(Self::scope(vendor_id));
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            let status: QueryStatus = status.parse().map_err(VendoraError::Validation)?;
            select = select.filter(queries::Column::Status.eq(status.as_str()));
        }
        Ok(select
            .order_by_desc(queries::Column::CreatedAt)
            .order_by_desc(queries::Column::Id)
            .all(self.ctx.db.as_ref())
            .await?)
    }

    pub async fn get(&self, vendor_id: i32, id: i32) -> VendoraResult<queries::Model> {
        queries::Entity::find_by_id(id)
            .filter(Self::scope(vendor_id))
            .one(self.ctx.db.as_ref())
            .await?
            .ok_or_else(|| VendoraError::not_found("Query"))
    }

    /// Updates reply/status. A new reply is pushed to the customer's chat.
    pub async fn update(&self, vendor_id: i32, id: i32, patch: QueryPatch) -> VendoraResult<queries::Model> {
        let query = self.get(vendor_id, id).await?;
        let chat_id = query.customer_chat_id;
        let mut active = query.into_active_model();
        let reply = patch.reply.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let explicit_status = match patch.status.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<QueryStatus>().map_err(VendoraError::Validation)?),
            None => None,
        };
        if let Some(reply) = &reply {
            active.reply = Set(Some(reply.clone()));
            active.status = Set(explicit_status.unwrap_or(QueryStatus::Replied).as_str().to_string());
        } else if let Some(status) = explicit_status {
            active.status = Set(status.as_str().to_string());
        }

        let mut delivered = false;
        if let (Some(reply), Some(chat_id)) = (&reply, chat_id) {
            delivered = send_best_effort(
                self.ctx.telegram.as_ref(),
                OutboundMessage::text(chat_id, format!("💬 Reply from the vendor:\n\n{}", reply)),
            )
            .await;
        }
        if delivered {
            active.notified_at = Set(Some(Utc::now()));
        }
        Ok(active.update(self.ctx.db.as_ref()).await?)
    }
}
