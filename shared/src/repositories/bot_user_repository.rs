use chrono::{DateTime, Utc};
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, QueryOrder, Set};
use std::sync::Arc;

use crate::entity::bot_users;
use crate::error::is_unique_violation;

pub struct BotUserRepository {
    db: Arc<DatabaseConnection>,
}

impl BotUserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_chat_id(&self, chat_id: i64) -> Result<Option<bot_users::Model>, DbErr> {
        bot_users::Entity::find()
            .filter(bot_users::Column::ChatId.eq(chat_id))
            .one(self.db.as_ref())
            .await
    }

    pub async fn get_or_create(&self, chat_id: i64) -> Result<bot_users::Model, DbErr> {
        if let Some(user) = self.find_by_chat_id(chat_id).await? {
            return Ok(user);
        }
        let active = bot_users::ActiveModel {
            chat_id: Set(chat_id),
            vendor_id: Set(None),
            is_subscribed: Set(false),
            state: Set(None),
            state_updated_at: Set(None),
            temp_type: Set(None),
            temp_asset: Set(None),
            temp_amount: Set(None),
            temp_order_id: Set(None),
            temp_query_id: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        match active.insert(self.db.as_ref()).await {
            Ok(user) => Ok(user),
            // Two updates from the same chat raced the insert
            Err(e) if is_unique_violation(&e) => self
                .find_by_chat_id(chat_id)
                .await?
                .ok_or(e),
            Err(e) => Err(e),
        }
    }

    pub async fn update(&self, active_model: bot_users::ActiveModel) -> Result<bot_users::Model, DbErr> {
        active_model.update(self.db.as_ref()).await
    }

    /// Clears sessions whose state has not moved since `before`.
    pub async fn reset_stale(&self, before: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = bot_users::Entity::update_many()
            .col_expr(bot_users::Column::State, Expr::value(Option::<String>::None))
            .col_expr(bot_users::Column::StateUpdatedAt, Expr::value(Option::<DateTime<Utc>>::None))
            .col_expr(bot_users::Column::TempType, Expr::value(Option::<String>::None))
            .col_expr(bot_users::Column::TempAsset, Expr::value(Option::<String>::None))
            .col_expr(bot_users::Column::TempAmount, Expr::value(Option::<rust_decimal::Decimal>::None))
            .col_expr(bot_users::Column::TempOrderId, Expr::value(Option::<i32>::None))
            .col_expr(bot_users::Column::TempQueryId, Expr::value(Option::<i32>::None))
            .filter(bot_users::Column::State.is_not_null())
            .filter(bot_users::Column::StateUpdatedAt.lt(before))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    /// Subscribed chats linked to `vendor_id`.
    pub async fn subscribers_of(&self, vendor_id: i32) -> Result<Vec<bot_users::Model>, DbErr> {
        bot_users::Entity::find()
            .filter(bot_users::Column::VendorId.eq(vendor_id))
            .filter(bot_users::Column::IsSubscribed.eq(true))
            .order_by_asc(bot_users::Column::Id)
            .all(self.db.as_ref())
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        bot_users::Entity::find().count(self.db.as_ref()).await
    }
}
