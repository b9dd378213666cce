//! Initial schema for the shared-expense ledger.
//!
//! - `users`: accounts (auth material lives here)
//! - `groups` / `group_members`: who shares expenses with whom
//! - `group_expenses` / `group_expense_splits`: expenses and per-member debt
//! - `wallets`: one internal balance per user
//! - `transactions`: append-only ledger, `reference` is the idempotency key
//! - `group_invitations`: hashed invitation tokens

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    FirstName,
    PasswordHash,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Name,
    Description,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum GroupMembers {
    Table,
    GroupId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(Iden)]
enum GroupExpenses {
    Table,
    Id,
    GroupId,
    PaidBy,
    Description,
    AmountMinor,
    CreatedAt,
}

#[derive(Iden)]
enum GroupExpenseSplits {
    Table,
    Id,
    ExpenseId,
    OwedBy,
    AmountOwedMinor,
    AmountPaidMinor,
    IsSettled,
    CreatedAt,
}

#[derive(Iden)]
enum Wallets {
    Table,
    Id,
    UserId,
    BalanceMinor,
    LastFundedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    Direction,
    Category,
    AmountMinor,
    Status,
    Reference,
    Description,
    CreatedAt,
}

#[derive(Iden)]
enum GroupInvitations {
    Table,
    Id,
    GroupId,
    Email,
    TokenHash,
    Status,
    InvitedBy,
    ExpiresAt,
    CreatedAt,
}

fn id_column<T: Iden + 'static>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(id_column(Users::Id))
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::FirstName).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(id_column(Groups::Id))
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(ColumnDef::new(Groups::Description).string())
                    .col(ColumnDef::new(Groups::CreatedBy).big_integer().not_null())
                    .col(ColumnDef::new(Groups::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-groups-created_by")
                            .from(Groups::Table, Groups::CreatedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMembers::GroupId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupMembers::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(GroupMembers::Role)
                            .string()
                            .not_null()
                            .default("member"),
                    )
                    .col(ColumnDef::new(GroupMembers::JoinedAt).timestamp().not_null())
                    .primary_key(
                        Index::create()
                            .col(GroupMembers::GroupId)
                            .col(GroupMembers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_members-group_id")
                            .from(GroupMembers::Table, GroupMembers::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_members-user_id")
                            .from(GroupMembers::Table, GroupMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-group_members-user_id")
                    .table(GroupMembers::Table)
                    .col(GroupMembers::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupExpenses::Table)
                    .if_not_exists()
                    .col(id_column(GroupExpenses::Id))
                    .col(ColumnDef::new(GroupExpenses::GroupId).big_integer().not_null())
                    .col(ColumnDef::new(GroupExpenses::PaidBy).big_integer().not_null())
                    .col(
                        ColumnDef::new(GroupExpenses::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(GroupExpenses::AmountMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(GroupExpenses::AmountMinor).gt(0)),
                    )
                    .col(ColumnDef::new(GroupExpenses::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_expenses-group_id")
                            .from(GroupExpenses::Table, GroupExpenses::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_expenses-paid_by")
                            .from(GroupExpenses::Table, GroupExpenses::PaidBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-group_expenses-group_id")
                    .table(GroupExpenses::Table)
                    .col(GroupExpenses::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupExpenseSplits::Table)
                    .if_not_exists()
                    .col(id_column(GroupExpenseSplits::Id))
                    .col(
                        ColumnDef::new(GroupExpenseSplits::ExpenseId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupExpenseSplits::OwedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupExpenseSplits::AmountOwedMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(GroupExpenseSplits::AmountOwedMinor).gte(0)),
                    )
                    .col(
                        ColumnDef::new(GroupExpenseSplits::AmountPaidMinor)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(GroupExpenseSplits::AmountPaidMinor).gte(0)),
                    )
                    .col(
                        ColumnDef::new(GroupExpenseSplits::IsSettled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GroupExpenseSplits::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_expense_splits-expense_id")
                            .from(GroupExpenseSplits::Table, GroupExpenseSplits::ExpenseId)
                            .to(GroupExpenses::Table, GroupExpenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_expense_splits-owed_by")
                            .from(GroupExpenseSplits::Table, GroupExpenseSplits::OwedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-group_expense_splits-owed_by-is_settled")
                    .table(GroupExpenseSplits::Table)
                    .col(GroupExpenseSplits::OwedBy)
                    .col(GroupExpenseSplits::IsSettled)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-group_expense_splits-expense_id")
                    .table(GroupExpenseSplits::Table)
                    .col(GroupExpenseSplits::ExpenseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(id_column(Wallets::Id))
                    .col(
                        ColumnDef::new(Wallets::UserId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Wallets::BalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Wallets::BalanceMinor).gte(0)),
                    )
                    .col(ColumnDef::new(Wallets::LastFundedAt).timestamp())
                    .col(ColumnDef::new(Wallets::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-wallets-user_id")
                            .from(Wallets::Table, Wallets::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(id_column(Transactions::Id))
                    .col(ColumnDef::new(Transactions::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::Direction).string().not_null())
                    .col(ColumnDef::new(Transactions::Category).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Transactions::AmountMinor).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string()
                            .not_null()
                            .default("success"),
                    )
                    .col(ColumnDef::new(Transactions::Reference).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Transactions::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-user_id")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-reference-unique")
                    .table(Transactions::Table)
                    .col(Transactions::Reference)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupInvitations::Table)
                    .if_not_exists()
                    .col(id_column(GroupInvitations::Id))
                    .col(
                        ColumnDef::new(GroupInvitations::GroupId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupInvitations::Email).string().not_null())
                    .col(
                        ColumnDef::new(GroupInvitations::TokenHash)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(GroupInvitations::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(GroupInvitations::InvitedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupInvitations::ExpiresAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupInvitations::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_invitations-group_id")
                            .from(GroupInvitations::Table, GroupInvitations::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_invitations-invited_by")
                            .from(GroupInvitations::Table, GroupInvitations::InvitedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-group_invitations-status-expires_at")
                    .table(GroupInvitations::Table)
                    .col(GroupInvitations::Status)
                    .col(GroupInvitations::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupInvitations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupExpenseSplits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupExpenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
