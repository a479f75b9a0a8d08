//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bot_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub chat_id: i64,
    pub vendor_id: Option<i32>,
    pub is_subscribed: bool,
    pub state: Option<String>,
    pub state_updated_at: Option<DateTimeUtc>,
    pub temp_type: Option<String>,
    pub temp_asset: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((20, 8)))", nullable)]
    pub temp_amount: Option<Decimal>,
    pub temp_order_id: Option<i32>,
    pub temp_query_id: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendors::Entity",
        from = "Column::VendorId",
        to = "super::vendors::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Vendors,
}

impl Related<super::vendors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendors.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
