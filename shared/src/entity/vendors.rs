//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "vendors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub telegram_username: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bank_details: Option<String>,
    #[sea_orm(unique)]
    pub external_vendor_id: Option<String>,
    pub auto_expire_minutes: Option<i32>,
    pub auto_accept: bool,
    pub is_available: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub unavailable_message: Option<String>,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_trial: bool,
    pub trial_started_at: Option<DateTimeUtc>,
    pub trial_expires_at: Option<DateTimeUtc>,
    pub plan: String, // "trial", "monthly", "yearly", "perpetual", "none"
    pub plan_expires_at: Option<DateTimeUtc>,
    pub is_service_active: bool,
    pub daily_orders_count: i32,
    pub daily_orders_date: Option<Date>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
    #[sea_orm(has_many = "super::rates::Entity")]
    Rates,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::rates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn plan(&self) -> crate::domain::Plan {
        self.plan.parse().unwrap_or(crate::domain::Plan::None)
    }

    /// Name shown to customers: `@handle` when set, else the vendor name.
    pub fn display_name(&self) -> String {
        match self.telegram_username.as_deref().map(|u| u.trim_start_matches('@')) {
            Some(handle) if !handle.is_empty() => format!("@{}", handle),
            _ => self.name.clone(),
        }
    }
}
