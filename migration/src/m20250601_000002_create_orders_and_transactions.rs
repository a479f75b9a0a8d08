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
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Orders::VendorId).integer().not_null())
                    .col(ColumnDef::new(Orders::CustomerChatId).big_integer().null())
                    .col(ColumnDef::new(Orders::CustomerName).string_len(255).null())
                    .col(ColumnDef::new(Orders::Asset).string_len(20).not_null())
                    .col(ColumnDef::new(Orders::OrderType).string_len(4).not_null()) // buy, sell
                    .col(ColumnDef::new(Orders::Amount).decimal_len(crate::decimal_precision(manager, 20), 8).not_null())
                    .col(ColumnDef::new(Orders::Rate).decimal_len(crate::decimal_precision(manager, 20), 2).not_null())
                    .col(ColumnDef::new(Orders::TotalValue).decimal_len(crate::decimal_precision(manager, 24), 2).not_null())
                    .col(ColumnDef::new(Orders::Status).string_len(10).not_null().default("pending"))
                    .col(ColumnDef::new(Orders::OrderCode).string_len(40).not_null().unique_key())
                    .col(ColumnDef::new(Orders::AutoExpireAt).timestamp().null())
                    .col(ColumnDef::new(Orders::RejectionReason).text().null())
                    .col(ColumnDef::new(Orders::AcceptanceNote).text().null())
                    .col(ColumnDef::new(Orders::PayInstructions).text().null())
                    .col(ColumnDef::new(Orders::SendInstructions).text().null())
                    .col(ColumnDef::new(Orders::AcceptedAt).timestamp().null())
                    .col(ColumnDef::new(Orders::DeclinedAt).timestamp().null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_vendor")
                            .from(Orders::Table, Orders::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The expiry sweep scans pending orders by deadline
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_status_expire")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .col(Orders::AutoExpireAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_vendor_created")
                    .table(Orders::Table)
                    .col(Orders::VendorId)
                    .col(Orders::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Transactions::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Transactions::OrderId).integer().not_null().unique_key())
                    .col(ColumnDef::new(Transactions::Proof).string_len(255).null())
                    .col(ColumnDef::new(Transactions::ProofUploadedAt).timestamp().null())
                    .col(ColumnDef::new(Transactions::Status).string_len(12).not_null().default("uncompleted"))
                    .col(ColumnDef::new(Transactions::CompletedAt).timestamp().null())
                    .col(ColumnDef::new(Transactions::CustomerReceivingDetails).text().null())
                    .col(ColumnDef::new(Transactions::CustomerNote).text().null())
                    .col(ColumnDef::new(Transactions::VendorProof).string_len(255).null())
                    .col(ColumnDef::new(Transactions::VendorCompletedAt).timestamp().null())
                    .col(ColumnDef::new(Transactions::VendorNotified).boolean().not_null().default(false))
                    .col(ColumnDef::new(Transactions::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Transactions::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_order")
                            .from(Transactions::Table, Transactions::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Transactions::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    VendorId,
    CustomerChatId,
    CustomerName,
    Asset,
    OrderType,
    Amount,
    Rate,
    TotalValue,
    Status,
    OrderCode,
    AutoExpireAt,
    RejectionReason,
    AcceptanceNote,
    PayInstructions,
    SendInstructions,
    AcceptedAt,
    DeclinedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    OrderId,
    Proof,
    ProofUploadedAt,
    Status,
    CompletedAt,
    CustomerReceivingDetails,
    CustomerNote,
    VendorProof,
    VendorCompletedAt,
    VendorNotified,
    CreatedAt,
    UpdatedAt,
}
