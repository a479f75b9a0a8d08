pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

mod m20250601_000001_create_vendors;
mod m20250601_000002_create_orders_and_transactions;
mod m20250601_000003_create_bot_users_and_queries;
mod m20250601_000004_create_notifications;
mod m20250612_000001_create_payment_requests;
mod m20250620_000001_create_broadcast_messages;

/// Decimal precision for `manager`'s backend. SQLite caps it at 16 digits.
pub(crate) fn decimal_precision(manager: &SchemaManager, precision: u32) -> u32 {
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => precision.min(16),
        _ => precision,
    }
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_vendors::Migration),
            Box::new(m20250601_000002_create_orders_and_transactions::Migration),
            Box::new(m20250601_000003_create_bot_users_and_queries::Migration),
            Box::new(m20250601_000004_create_notifications::Migration),
            Box::new(m20250612_000001_create_payment_requests::Migration),
            Box::new(m20250620_000001_create_broadcast_messages::Migration),
        ]
    }
}
