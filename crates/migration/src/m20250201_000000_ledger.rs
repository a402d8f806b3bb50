//! Ledger schema.
//!
//! - `budgets`: one spending limit per `(user_id, category)`, enforced by a
//!   unique index that the budget upsert targets;
//! - `expenses`: admitted transactions, amounts in integer cents.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    UserId,
    Category,
    LimitMinor,
    Period,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    UserId,
    AmountMinor,
    Category,
    Description,
    SpentOn,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::UserId).uuid().not_null())
                    .col(ColumnDef::new(Budgets::Category).string().not_null())
                    .col(ColumnDef::new(Budgets::LimitMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Budgets::Period)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-user-category")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .col(Budgets::Category)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Expenses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Expenses::UserId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::Category).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Expenses::SpentOn).date().not_null())
                    .to_owned(),
            )
            .await?;

        // Serves both the windowed sums and the grouped report query.
        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-user-category-spent-on")
                    .table(Expenses::Table)
                    .col(Expenses::UserId)
                    .col(Expenses::Category)
                    .col(Expenses::SpentOn)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        Ok(())
    }
}
