use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_vendors::Vendors;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notifications::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Notifications::VendorId).integer().not_null())
                    .col(ColumnDef::new(Notifications::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(ColumnDef::new(Notifications::IsRead).boolean().not_null().default(false))
                    .col(ColumnDef::new(Notifications::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_vendor")
                            .from(Notifications::Table, Notifications::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PushSubscriptions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PushSubscriptions::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(PushSubscriptions::VendorId).integer().not_null())
                    .col(ColumnDef::new(PushSubscriptions::Endpoint).string_len(500).not_null().unique_key())
                    .col(ColumnDef::new(PushSubscriptions::P256dh).string_len(255).not_null())
                    .col(ColumnDef::new(PushSubscriptions::Auth).string_len(255).not_null())
                    .col(ColumnDef::new(PushSubscriptions::UserAgent).string_len(255).null())
                    .col(ColumnDef::new(PushSubscriptions::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_push_subscriptions_vendor")
                            .from(PushSubscriptions::Table, PushSubscriptions::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Account notices are sent at most once per (vendor, kind)
        manager
            .create_table(
                Table::create()
                    .table(NotificationLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NotificationLogs::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(NotificationLogs::VendorId).integer().not_null())
                    .col(ColumnDef::new(NotificationLogs::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(NotificationLogs::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_logs_vendor")
                            .from(NotificationLogs::Table, NotificationLogs::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_notification_logs_vendor_kind")
                    .table(NotificationLogs::Table)
                    .col(NotificationLogs::VendorId)
                    .col(NotificationLogs::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(NotificationLogs::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(PushSubscriptions::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Notifications::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    VendorId,
    Title,
    Message,
    IsRead,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PushSubscriptions {
    Table,
    Id,
    VendorId,
    Endpoint,
    P256dh,
    Auth,
    UserAgent,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NotificationLogs {
    Table,
    Id,
    VendorId,
    Kind,
    CreatedAt,
}
