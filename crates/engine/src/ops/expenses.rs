use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{
    EngineError, Expense, ExpenseCmd, ExpenseDetail, ExpenseSplit, ExpenseUpdate, Money,
    ResultEngine, allocate_splits, expense_splits, expenses,
};

use super::{Engine, normalize_optional_text};

impl Engine {
    /// Log an expense and split it equally between the payer and every other
    /// group member.
    ///
    /// The member list is read inside the same unit of work as the inserts,
    /// so the splits reflect the membership at commit time.
    pub async fn create_expense(&self, cmd: ExpenseCmd) -> ResultEngine<ExpenseDetail> {
        let ExpenseCmd {
            group_id,
            paid_by,
            description,
            amount,
        } = cmd;
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        let description = normalize_optional_text(Some(&description)).unwrap_or_default();

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_member(db_tx, group_id, paid_by).await?;
                let others = engine.other_members(db_tx, group_id, paid_by).await?;
                let allocation = allocate_splits(amount, &others)?;

                let now = engine.clock.now();
                let expense = expenses::new_active(group_id, paid_by, description, amount, now)
                    .insert(db_tx)
                    .await?;
                let splits = engine
                    .insert_splits(db_tx, expense.id, &allocation.splits)
                    .await?;

                tracing::info!(
                    expense_id = expense.id,
                    group_id,
                    amount = %amount,
                    members = splits.len() + 1,
                    "expense created"
                );
                Ok(ExpenseDetail {
                    expense: Expense::from(expense),
                    splits,
                })
            })
        })
        .await
    }

    /// Apply a partial update. Only the payer may edit an expense.
    ///
    /// A new amount discards the current splits and regenerates them from
    /// the current membership. This is refused with
    /// [`EngineError::Conflict`] once any split has been paid down.
    pub async fn update_expense(
        &self,
        expense_id: i64,
        user_id: i64,
        update: ExpenseUpdate,
    ) -> ResultEngine<ExpenseDetail> {
        if update.is_empty() {
            return Err(EngineError::Validation(
                "provide at least one of description or amount".to_string(),
            ));
        }
        if let Some(amount) = update.amount
            && !amount.is_positive()
        {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        let description = update
            .description
            .as_deref()
            .map(|d| normalize_optional_text(Some(d)).unwrap_or_default());
        let new_amount = update.amount;

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine.require_expense(db_tx, expense_id).await?;
                engine
                    .require_member(db_tx, model.group_id, user_id)
                    .await?;
                if model.paid_by != user_id {
                    return Err(EngineError::Forbidden(
                        "only the payer can edit an expense".to_string(),
                    ));
                }

                let group_id = model.group_id;
                let paid_by = model.paid_by;
                let mut active: expenses::ActiveModel = model.into();
                if let Some(description) = description {
                    active.description = sea_orm::ActiveValue::Set(description);
                }
                if let Some(amount) = new_amount {
                    active.amount_minor = sea_orm::ActiveValue::Set(amount.minor());
                }
                let updated = active.update(db_tx).await?;

                let splits = match new_amount {
                    Some(amount) => {
                        engine.discard_splits(db_tx, expense_id).await?;
                        let others = engine.other_members(db_tx, group_id, paid_by).await?;
                        let allocation = allocate_splits(amount, &others)?;
                        tracing::info!(
                            expense_id,
                            amount = %amount,
                            "expense amount changed, splits regenerated"
                        );
                        engine
                            .insert_splits(db_tx, expense_id, &allocation.splits)
                            .await?
                    }
                    None => engine.load_splits(db_tx, expense_id).await?,
                };

                Ok(ExpenseDetail {
                    expense: Expense::from(updated),
                    splits,
                })
            })
        })
        .await
    }

    /// Delete an expense that nobody has paid against yet. Payer only.
    pub async fn delete_expense(&self, expense_id: i64, user_id: i64) -> ResultEngine<()> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine.require_expense(db_tx, expense_id).await?;
                if model.paid_by != user_id {
                    return Err(EngineError::Forbidden(
                        "only the payer can delete an expense".to_string(),
                    ));
                }
                engine.discard_splits(db_tx, expense_id).await?;
                expenses::Entity::delete_by_id(expense_id).exec(db_tx).await?;
                tracing::info!(expense_id, "expense deleted");
                Ok(())
            })
        })
        .await
    }

    /// Expense plus its splits, visible to group members only.
    pub async fn expense_detail(
        &self,
        expense_id: i64,
        user_id: i64,
    ) -> ResultEngine<ExpenseDetail> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine.require_expense(db_tx, expense_id).await?;
                engine
                    .require_member(db_tx, model.group_id, user_id)
                    .await?;
                let splits = engine.load_splits(db_tx, expense_id).await?;
                Ok(ExpenseDetail {
                    expense: Expense::from(model),
                    splits,
                })
            })
        })
        .await
    }

    /// Every expense of a group, newest first.
    pub async fn list_group_expenses(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> ResultEngine<Vec<Expense>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_member(db_tx, group_id, user_id).await?;
                let rows = expenses::Entity::find()
                    .filter(expenses::Column::GroupId.eq(group_id))
                    .order_by_desc(expenses::Column::CreatedAt)
                    .order_by_desc(expenses::Column::Id)
                    .all(db_tx)
                    .await?;
                Ok(rows.into_iter().map(Expense::from).collect())
            })
        })
        .await
    }

    pub(super) async fn require_expense(
        &self,
        db: &DatabaseTransaction,
        expense_id: i64,
    ) -> ResultEngine<expenses::Model> {
        expenses::Entity::find_by_id(expense_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))
    }

    async fn other_members(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
        paid_by: i64,
    ) -> ResultEngine<Vec<i64>> {
        Ok(self
            .group_member_ids(db, group_id)
            .await?
            .into_iter()
            .filter(|id| *id != paid_by)
            .collect())
    }

    async fn insert_splits(
        &self,
        db: &DatabaseTransaction,
        expense_id: i64,
        shares: &[(i64, Money)],
    ) -> ResultEngine<Vec<ExpenseSplit>> {
        let now = self.clock.now();
        let mut out = Vec::with_capacity(shares.len());
        for (owed_by, amount) in shares {
            let model = expense_splits::new_active(expense_id, *owed_by, *amount, now)
                .insert(db)
                .await?;
            out.push(ExpenseSplit::from(model));
        }
        Ok(out)
    }

    async fn load_splits(
        &self,
        db: &DatabaseTransaction,
        expense_id: i64,
    ) -> ResultEngine<Vec<ExpenseSplit>> {
        let rows = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id))
            .order_by_asc(expense_splits::Column::Id)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(ExpenseSplit::from).collect())
    }

    /// Drop every split of an expense, provided none has settlement history.
    ///
    /// The delete is guarded on `amount_paid = 0`; a row count lower than
    /// what was read means a settlement landed in between.
    async fn discard_splits(&self, db: &DatabaseTransaction, expense_id: i64) -> ResultEngine<()> {
        let current = self.load_splits(db, expense_id).await?;
        if current.iter().any(ExpenseSplit::has_settlement_history) {
            return Err(EngineError::Conflict(
                "expense already has settlement history".to_string(),
            ));
        }
        let result = expense_splits::Entity::delete_many()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id))
            .filter(expense_splits::Column::AmountPaidMinor.eq(0))
            .exec(db)
            .await?;
        if result.rows_affected != current.len() as u64 {
            return Err(EngineError::Conflict(
                "expense splits changed concurrently".to_string(),
            ));
        }
        Ok(())
    }
}
