use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, IntoActiveModel, QueryOrder, Set};

use super::ServiceContext;
use crate::entity::{notifications, push_subscriptions};
use crate::error::{VendoraError, VendoraResult};

/// In-app vendor notifications and Web Push subscription bookkeeping.
pub struct NotificationService {
    ctx: ServiceContext,
}

impl NotificationService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Records a notification for the vendor; failures are logged only.
    pub async fn notify_vendor(&self, vendor_id: i32, title: &str, message: &str) {
        let active = notifications::ActiveModel {
            vendor_id: Set(vendor_id),
            title: Set(title.to_string()),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = active.insert(self.ctx.db.as_ref()).await {
            tracing::warn!(vendor_id, "failed to store notification: {}", e);
            return;
        }
        match self.subscription_count(vendor_id).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(vendor_id, subscriptions = n, "web push queued: {}", title),
            Err(e) => tracing::debug!(vendor_id, "push subscription lookup failed: {}", e),
        }
    }

    pub async fn list(&self, vendor_id: i32, unread_only: bool) -> VendoraResult<Vec<notifications::Model>> {
        let mut query = notifications::Entity::find().filter(notifications::Column::VendorId.eq(vendor_id));
        if unread_only {
            query = query.filter(notifications::Column::IsRead.eq(false));
        }
        Ok(query
            .order_by_desc(notifications::Column::CreatedAt)
            .order_by_desc(notifications::Column::Id)
            .all(self.ctx.db.as_ref())
            .await?)
    }

    /// Marks the given notifications (or all of them) read.
    pub async fn mark_read(&self, vendor_id: i32, ids: Option<Vec<i32>>) -> VendoraResult<u64> {
        let mut update = notifications::Entity::update_many()
            .col_expr(notifications::Column::IsRead, Expr::value(true))
            .filter(notifications::Column::VendorId.eq(vendor_id))
            .filter(notifications::Column::IsRead.eq(false));
        if let Some(ids) = ids {
            update = update.filter(notifications::Column::Id.is_in(ids));
        }
        Ok(update.exec(self.ctx.db.as_ref()).await?.rows_affected)
    }

    pub async fn subscribe(
        &self,
        vendor_id: i32,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
        user_agent: Option<String>,
    ) -> VendoraResult<push_subscriptions::Model> {
        if endpoint.trim().is_empty() || p256dh.trim().is_empty() || auth.trim().is_empty() {
            return Err(VendoraError::validation("Invalid subscription"));
        }
        let existing = push_subscriptions::Entity::find()
            .filter(push_subscriptions::Column::Endpoint.eq(endpoint))
            .one(self.ctx.db.as_ref())
            .await?;
        let saved = match existing {
            Some(sub) => {
                let mut active = sub.into_active_model();
                active.vendor_id = Set(vendor_id);
                active.p256dh = Set(p256dh.to_string());
                active.auth = Set(auth.to_string());
                active.user_agent = Set(user_agent);
                active.update(self.ctx.db.as_ref()).await?
            }
            None => {
                push_subscriptions::ActiveModel {
                    vendor_id: Set(vendor_id),
                    endpoint: Set(endpoint.to_string()),
                    p256dh: Set(p256dh.to_string()),
                    auth: Set(auth.to_string()),
                    user_agent: Set(user_agent),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(self.ctx.db.as_ref())
                .await?
            }
        };
        Ok(saved)
    }

    pub async fn unsubscribe(&self, vendor_id: i32, endpoint: &str) -> VendoraResult<u64> {
        let result = push_subscriptions::Entity::delete_many()
            .filter(push_subscriptions::Column::VendorId.eq(vendor_id))
            .filter(push_subscriptions::Column::Endpoint.eq(endpoint))
            .exec(self.ctx.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn subscription_count(&self, vendor_id: i32) -> Result<u64, DbErr> {
        push_subscriptions::Entity::find()
            .filter(push_subscriptions::Column::VendorId.eq(vendor_id))
            .count(self.ctx.db.as_ref())
            .await
    }
}
