//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::domain::TransactionStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub order_id: i32,
    pub proof: Option<String>,
    pub proof_uploaded_at: Option<DateTimeUtc>,
    pub status: String, // "uncompleted", "completed", "declined", "expired"
    pub completed_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub customer_receiving_details: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub customer_note: Option<String>,
    pub vendor_proof: Option<String>,
    pub vendor_completed_at: Option<DateTimeUtc>,
    pub vendor_notified: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Orders,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> TransactionStatus {
        self.status.parse().unwrap_or(TransactionStatus::Uncompleted)
    }
}
