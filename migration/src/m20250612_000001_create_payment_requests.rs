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
                    .table(PaymentRequests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PaymentRequests::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(PaymentRequests::VendorId).integer().not_null())
                    .col(ColumnDef::new(PaymentRequests::Note).text().null())
                    .col(ColumnDef::new(PaymentRequests::Receipt).string_len(255).null())
                    .col(ColumnDef::new(PaymentRequests::Status).string_len(10).not_null().default("pending")) // pending, approved, rejected
                    .col(ColumnDef::new(PaymentRequests::ProcessedBy).integer().null())
                    .col(ColumnDef::new(PaymentRequests::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(PaymentRequests::ProcessedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_requests_vendor")
                            .from(PaymentRequests::Table, PaymentRequests::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PaymentRequests {
    Table,
    Id,
    VendorId,
    Note,
    Receipt,
    Status,
    ProcessedBy,
    CreatedAt,
    ProcessedAt,
}
