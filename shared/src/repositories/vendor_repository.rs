use sea_orm::prelude::*;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ActiveModelTrait, QueryOrder};
use std::sync::Arc;

use crate::entity::{rates, vendors};

pub struct VendorRepository {
    db: Arc<DatabaseConnection>,
}

fn lower_eq(column: vendors::Column, value: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col((vendors::Entity, column)))).eq(value.to_lowercase())
}

impl VendorRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<vendors::Model>, DbErr> {
        vendors::Entity::find_by_id(id).one(self.db.as_ref()).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<vendors::Model>, DbErr> {
        vendors::Entity::find()
            .filter(lower_eq(vendors::Column::Email, email.trim()))
            .one(self.db.as_ref())
            .await
    }

    pub async fn find_by_external_id(&self, code: &str) -> Result<Option<vendors::Model>, DbErr> {
        vendors::Entity::find()
            .filter(lower_eq(vendors::Column::ExternalVendorId, code))
            .one(self.db.as_ref())
            .await
    }

    pub async fn find_by_telegram_username(&self, handle: &str) -> Result<Option<vendors::Model>, DbErr> {
        let handle = handle.trim_start_matches('@');
        // Stored handles may or may not carry the leading '@'
        vendors::Entity::find()
            .filter(
                sea_orm::Condition::any()
                    .add(lower_eq(vendors::Column::TelegramUsername, handle))
                    .add(lower_eq(vendors::Column::TelegramUsername, &format!("@{}", handle))),
            )
            .one(self.db.as_ref())
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<vendors::Model>, DbErr> {
        vendors::Entity::find()
            .filter(lower_eq(vendors::Column::Name, name))
            .order_by_asc(vendors::Column::Id)
            .one(self.db.as_ref())
            .await
    }

    /// Resolves a `/start` token or typed vendor reference: numeric id,
    /// then external code, then Telegram handle, then display name.
    pub async fn resolve(&self, token: &str) -> Result<Option<vendors::Model>, DbErr> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        if let Ok(id) = token.parse::<i32>() {
            if let Some(v) = self.find_by_id(id).await? {
                return Ok(Some(v));
            }
        }
        if let Some(v) = self.find_by_external_id(token).await? {
            return Ok(Some(v));
        }
        if let Some(v) = self.find_by_telegram_username(token).await? {
            return Ok(Some(v));
        }
        self.find_by_name(token).await
    }

    /// Vendors that publish a rate for `asset`.
    pub async fn with_asset(&self, asset: &str) -> Result<Vec<vendors::Model>, DbErr> {
        let vendor_ids: Vec<i32> = rates::Entity::find()
            .filter(rates::Column::Asset.eq(asset.to_uppercase()))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|r| r.vendor_id)
            .collect();
        if vendor_ids.is_empty() {
            return Ok(Vec::new());
        }
        vendors::Entity::find()
            .filter(vendors::Column::Id.is_in(vendor_ids))
            .all(self.db.as_ref())
            .await
    }

    pub async fn create(&self, active_model: vendors::ActiveModel) -> Result<vendors::Model, DbErr> {
        active_model.insert(self.db.as_ref()).await
    }

    pub async fn update(&self, active_model: vendors::ActiveModel) -> Result<vendors::Model, DbErr> {
        active_model.update(self.db.as_ref()).await
    }

    pub async fn list_all(&self) -> Result<Vec<vendors::Model>, DbErr> {
        vendors::Entity::find()
            .order_by_asc(vendors::Column::Id)
            .all(self.db.as_ref())
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        vendors::Entity::find().count(self.db.as_ref()).await
    }
}
