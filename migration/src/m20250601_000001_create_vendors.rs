use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Vendors are the authenticated accounts; never hard-deleted
        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vendors::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Vendors::Email).string_len(254).not_null().unique_key())
                    .col(ColumnDef::new(Vendors::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Vendors::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Vendors::TelegramUsername).string_len(64).null())
                    .col(ColumnDef::new(Vendors::Bio).text().null())
                    .col(ColumnDef::new(Vendors::BankDetails).text().null())
                    .col(ColumnDef::new(Vendors::ExternalVendorId).string_len(64).null().unique_key())
                    .col(ColumnDef::new(Vendors::AutoExpireMinutes).integer().null())
                    .col(ColumnDef::new(Vendors::AutoAccept).boolean().not_null().default(false))
                    .col(ColumnDef::new(Vendors::IsAvailable).boolean().not_null().default(true))
                    .col(ColumnDef::new(Vendors::UnavailableMessage).text().null())
                    .col(ColumnDef::new(Vendors::IsStaff).boolean().not_null().default(false))
                    .col(ColumnDef::new(Vendors::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(Vendors::IsTrial).boolean().not_null().default(true))
                    .col(ColumnDef::new(Vendors::TrialStartedAt).timestamp().null())
                    .col(ColumnDef::new(Vendors::TrialExpiresAt).timestamp().null())
                    .col(ColumnDef::new(Vendors::Plan).string_len(16).not_null().default("trial")) // trial, monthly, yearly, perpetual, none
                    .col(ColumnDef::new(Vendors::PlanExpiresAt).timestamp().null())
                    .col(ColumnDef::new(Vendors::IsServiceActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(Vendors::DailyOrdersCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Vendors::DailyOrdersDate).date().null())
                    .col(ColumnDef::new(Vendors::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BankDetails::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BankDetails::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(BankDetails::VendorId).integer().not_null())
                    .col(ColumnDef::new(BankDetails::BankName).string_len(128).not_null())
                    .col(ColumnDef::new(BankDetails::AccountNumber).string_len(64).not_null())
                    .col(ColumnDef::new(BankDetails::AccountName).string_len(128).not_null())
                    .col(ColumnDef::new(BankDetails::Instructions).text().null())
                    .col(ColumnDef::new(BankDetails::IsDefault).boolean().not_null().default(false))
                    .col(ColumnDef::new(BankDetails::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_details_vendor")
                            .from(BankDetails::Table, BankDetails::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rates::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Rates::VendorId).integer().not_null())
                    .col(ColumnDef::new(Rates::Asset).string_len(20).not_null())
                    .col(ColumnDef::new(Rates::BuyRate).decimal_len(crate::decimal_precision(manager, 20), 2).not_null())
                    .col(ColumnDef::new(Rates::SellRate).decimal_len(crate::decimal_precision(manager, 20), 2).not_null())
                    .col(ColumnDef::new(Rates::ContractAddress).string_len(255).null())
                    .col(ColumnDef::new(Rates::BankDetails).text().null())
                    .col(ColumnDef::new(Rates::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rates_vendor")
                            .from(Rates::Table, Rates::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_rates_vendor_asset")
                    .table(Rates::Table)
                    .col(Rates::VendorId)
                    .col(Rates::Asset)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Rates::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(BankDetails::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Vendors::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Vendors {
    Table,
    Id,
    Email,
    Name,
    PasswordHash,
    TelegramUsername,
    Bio,
    BankDetails,
    ExternalVendorId,
    AutoExpireMinutes,
    AutoAccept,
    IsAvailable,
    UnavailableMessage,
    IsStaff,
    IsActive,
    IsTrial,
    TrialStartedAt,
    TrialExpiresAt,
    Plan,
    PlanExpiresAt,
    IsServiceActive,
    DailyOrdersCount,
    DailyOrdersDate,
    CreatedAt,
}

#[derive(DeriveIden)]
enum BankDetails {
    Table,
    Id,
    VendorId,
    BankName,
    AccountNumber,
    AccountName,
    Instructions,
    IsDefault,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Rates {
    Table,
    Id,
    VendorId,
    Asset,
    BuyRate,
    SellRate,
    ContractAddress,
    BankDetails,
    UpdatedAt,
}
