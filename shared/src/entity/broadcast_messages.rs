//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::domain::BroadcastType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "broadcast_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub vendor_id: i32,
    pub message_type: String, // "asset_added", "rate_updated", "order_status", "general"
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub is_sent: bool,
    pub sent_at: Option<DateTimeUtc>,
    pub sent_count: i32,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn message_type(&self) -> BroadcastType {
        self.message_type.parse().unwrap_or(BroadcastType::General)
    }

    /// Text delivered to each subscribed chat.
    pub fn as_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.content)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendors::Entity",
        from = "Column::VendorId",
        to = "super::vendors::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Vendors,
}

impl Related<super::vendors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendors.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
