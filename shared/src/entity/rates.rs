//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "rates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub vendor_id: i32,
    pub asset: String,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub buy_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub sell_rate: Decimal,
    pub contract_address: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bank_details: Option<String>,
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
}

impl Related<super::vendors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendors.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn rate_for(&self, order_type: crate::domain::OrderType) -> Decimal {
        match order_type {
            crate::domain::OrderType::Buy => self.buy_rate,
            crate::domain::OrderType::Sell => self.sell_rate,
        }
    }
}
