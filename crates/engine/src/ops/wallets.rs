use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, LedgerEntry, Money, ResultEngine, Wallet,
    transactions::{self, NewLedgerEntry},
    wallets,
};

use super::Engine;

impl Engine {
    /// Current balance of a user's wallet. A user that never received money
    /// gets an empty snapshot; no row is created by reading.
    pub async fn wallet_snapshot(&self, user_id: i64) -> ResultEngine<Wallet> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                let model = wallets::Entity::find()
                    .filter(wallets::Column::UserId.eq(user_id))
                    .one(db_tx)
                    .await?;
                Ok(model.map_or_else(|| Wallet::empty(user_id), Wallet::from))
            })
        })
        .await
    }

    /// Latest ledger rows of a user, newest first.
    pub async fn ledger_entries(&self, user_id: i64, limit: u64) -> ResultEngine<Vec<LedgerEntry>> {
        let limit = limit.clamp(1, 500);
        self.with_tx(|_engine, db_tx| {
            Box::pin(async move {
                let rows = transactions::Entity::find()
                    .filter(transactions::Column::UserId.eq(user_id))
                    .order_by_desc(transactions::Column::CreatedAt)
                    .order_by_desc(transactions::Column::Id)
                    .limit(limit)
                    .all(db_tx)
                    .await?;
                rows.into_iter().map(LedgerEntry::try_from).collect()
            })
        })
        .await
    }

    /// Wallet row of `user_id`, inserted with a zero balance when missing.
    pub(super) async fn ensure_wallet(
        &self,
        db: &DatabaseTransaction,
        user_id: i64,
    ) -> ResultEngine<wallets::Model> {
        if let Some(model) = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(db)
            .await?
        {
            return Ok(model);
        }
        let model = wallets::new_active(user_id, self.clock.now())
            .insert(db)
            .await?;
        tracing::debug!(user_id, "wallet created");
        Ok(model)
    }

    /// Conditional debit: the balance check and the decrement are a single
    /// statement, so two concurrent debits can never overdraw the wallet.
    pub(super) async fn debit_wallet(
        &self,
        db: &DatabaseTransaction,
        user_id: i64,
        amount: Money,
    ) -> ResultEngine<()> {
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::BalanceMinor,
                Expr::col(wallets::Column::BalanceMinor).sub(amount.minor()),
            )
            .filter(wallets::Column::UserId.eq(user_id))
            .filter(wallets::Column::BalanceMinor.gte(amount.minor()))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::InsufficientFunds(format!(
                "wallet cannot cover {amount}"
            )));
        }
        Ok(())
    }

    /// Credit `amount` and stamp `last_funded_at`, creating the wallet if
    /// needed.
    pub(super) async fn credit_wallet(
        &self,
        db: &DatabaseTransaction,
        user_id: i64,
        amount: Money,
    ) -> ResultEngine<()> {
        self.ensure_wallet(db, user_id).await?;
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::BalanceMinor,
                Expr::col(wallets::Column::BalanceMinor).add(amount.minor()),
            )
            .col_expr(
                wallets::Column::LastFundedAt,
                Expr::value(Some(self.clock.now())),
            )
            .filter(wallets::Column::UserId.eq(user_id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("wallet not exists".to_string()));
        }
        Ok(())
    }

    pub(super) async fn append_ledger(
        &self,
        db: &DatabaseTransaction,
        entry: &NewLedgerEntry,
    ) -> ResultEngine<transactions::Model> {
        transactions::ActiveModel::from(entry)
            .insert(db)
            .await
            .map_err(Into::into)
    }
}
