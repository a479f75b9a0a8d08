//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{OrderStatus, OrderType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub vendor_id: i32,
    pub customer_chat_id: Option<i64>,
    pub customer_name: Option<String>,
    pub asset: String,
    #[serde(rename = "type")]
    pub order_type: String, // "buy" or "sell"
    #[sea_orm(column_type = "Decimal(Some((20, 8)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((24, 2)))")]
    pub total_value: Decimal,
    pub status: String, // "pending", "accepted", "declined", "expired", "completed"
    #[sea_orm(unique)]
    pub order_code: String,
    pub auto_expire_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub acceptance_note: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub pay_instructions: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub send_instructions: Option<String>,
    pub accepted_at: Option<DateTimeUtc>,
    pub declined_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
    #[sea_orm(has_one = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::vendors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendors.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn order_type(&self) -> OrderType {
        self.order_type.parse().unwrap_or(OrderType::Buy)
    }

    pub fn status(&self) -> OrderStatus {
        self.status.parse().unwrap_or(OrderStatus::Pending)
    }
}

/// `amount * rate`, rounded to two places.
pub fn total_value(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * rate).round_dp(2)
}
