//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "bank_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub vendor_id: i32,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub instructions: Option<String>,
    pub is_default: bool,
    pub created_at: DateTimeUtc,
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
    /// Payment instructions block sent to buyers.
    pub fn as_instructions(&self) -> String {
        let mut text = format!(
            "Bank: {}\nAccount Name: {}\nAccount Number: {}\n",
            self.bank_name, self.account_name, self.account_number
        );
        if let Some(extra) = self.instructions.as_deref().filter(|s| !s.trim().is_empty()) {
            text.push_str(&format!("Instructions: {}\n", extra));
        }
        text
    }
}
