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
                    .table(BroadcastMessages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BroadcastMessages::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(BroadcastMessages::VendorId).integer().not_null())
                    .col(ColumnDef::new(BroadcastMessages::MessageType).string_len(20).not_null().default("general")) // asset_added, rate_updated, order_status, general
                    .col(ColumnDef::new(BroadcastMessages::Title).string_len(100).not_null())
                    .col(ColumnDef::new(BroadcastMessages::Content).text().not_null())
                    .col(ColumnDef::new(BroadcastMessages::IsSent).boolean().not_null().default(false))
                    .col(ColumnDef::new(BroadcastMessages::SentAt).timestamp().null())
                    .col(ColumnDef::new(BroadcastMessages::SentCount).integer().not_null().default(0))
                    .col(ColumnDef::new(BroadcastMessages::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_broadcast_messages_vendor")
                            .from(BroadcastMessages::Table, BroadcastMessages::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_broadcast_messages_vendor")
                    .table(BroadcastMessages::Table)
                    .col(BroadcastMessages::VendorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BroadcastMessages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BroadcastMessages {
    Table,
    Id,
    VendorId,
    MessageType,
    Title,
    Content,
    IsSent,
    SentAt,
    SentCount,
    CreatedAt,
}
