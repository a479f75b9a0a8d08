use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_vendors::Vendors;
use super::m20250601_000002_create_orders_and_transactions::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per Telegram chat; state + temp_* hold the conversation session
        manager
            .create_table(
                Table::create()
                    .table(BotUsers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BotUsers::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(BotUsers::ChatId).big_integer().not_null().unique_key())
                    .col(ColumnDef::new(BotUsers::VendorId).integer().null())
                    .col(ColumnDef::new(BotUsers::IsSubscribed).boolean().not_null().default(false))
                    .col(ColumnDef::new(BotUsers::State).string_len(32).null())
                    .col(ColumnDef::new(BotUsers::StateUpdatedAt).timestamp().null())
                    .col(ColumnDef::new(BotUsers::TempType).string_len(4).null())
                    .col(ColumnDef::new(BotUsers::TempAsset).string_len(20).null())
                    .col(ColumnDef::new(BotUsers::TempAmount).decimal_len(crate::decimal_precision(manager, 20), 8).null())
                    .col(ColumnDef::new(BotUsers::TempOrderId).integer().null())
                    .col(ColumnDef::new(BotUsers::TempQueryId).integer().null())
                    .col(ColumnDef::new(BotUsers::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bot_users_vendor")
                            .from(BotUsers::Table, BotUsers::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Queries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Queries::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Queries::OrderId).integer().null())
                    .col(ColumnDef::new(Queries::VendorId).integer().null())
                    .col(ColumnDef::new(Queries::Message).text().not_null())
                    .col(ColumnDef::new(Queries::Contact).string_len(255).null())
                    .col(ColumnDef::new(Queries::Reply).text().null())
                    .col(ColumnDef::new(Queries::Status).string_len(10).not_null().default("pending")) // pending, replied, resolved
                    .col(ColumnDef::new(Queries::CustomerChatId).big_integer().null())
                    .col(ColumnDef::new(Queries::NotifiedAt).timestamp().null())
                    .col(ColumnDef::new(Queries::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_queries_order")
                            .from(Queries::Table, Queries::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_queries_vendor")
                            .from(Queries::Table, Queries::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Queries::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(BotUsers::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum BotUsers {
    Table,
    Id,
    ChatId,
    VendorId,
    IsSubscribed,
    State,
    StateUpdatedAt,
    TempType,
    TempAsset,
    TempAmount,
    TempOrderId,
    TempQueryId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Queries {
    Table,
    Id,
    OrderId,
    VendorId,
    Message,
    Contact,
    Reply,
    Status,
    CustomerChatId,
    NotifiedAt,
    CreatedAt,
}
