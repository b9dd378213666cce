//! Split settlement: moves money from the debtor's wallet to the payer's.

use sea_orm::{QueryFilter, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};

use crate::{
    Direction, EngineError, LedgerCategory, Money, Notification, ResultEngine, SettleCmd,
    expense_splits, groups, transactions::NewLedgerEntry,
};

use super::Engine;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub split_id: i64,
    pub remaining_owed: Money,
    pub is_fully_settled: bool,
}

impl Engine {
    /// Pay `amount` of split `split_id` out of the requester's wallet.
    ///
    /// Everything happens in one unit of work: the split update is a
    /// compare-and-swap on the owed amount read in the same transaction, the
    /// debit is conditional on the balance, the payer's wallet is credited and
    /// two ledger rows are appended. Any failure leaves no trace.
    ///
    /// A "payment received" notification for the payer is queued after the
    /// commit; its fate never affects the result.
    pub async fn settle_split(&self, cmd: SettleCmd) -> ResultEngine<SettlementOutcome> {
        let SettleCmd {
            split_id,
            user_id,
            amount,
        } = cmd;
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }

        let (outcome, notification) = self
            .with_tx(|engine, db_tx| {
                Box::pin(async move {
                    let split = expense_splits::Entity::find_by_id(split_id)
                        .one(db_tx)
                        .await?
                        .filter(|s| !s.is_settled)
                        .ok_or_else(|| {
                            EngineError::KeyNotFound("split not exists or settled".to_string())
                        })?;
                    if split.owed_by != user_id {
                        return Err(EngineError::Forbidden(
                            "only the debtor can settle this split".to_string(),
                        ));
                    }
                    let owed = Money::new(split.amount_owed_minor);
                    if amount > owed {
                        return Err(EngineError::InvalidAmount(format!(
                            "amount {amount} exceeds the {owed} still owed"
                        )));
                    }

                    let remaining = owed - amount;
                    let settled = remaining.is_zero();
                    let swapped = expense_splits::Entity::update_many()
                        .col_expr(
                            expense_splits::Column::AmountOwedMinor,
                            Expr::value(remaining.minor()),
                        )
                        .col_expr(
                            expense_splits::Column::AmountPaidMinor,
                            Expr::col(expense_splits::Column::AmountPaidMinor)
                                .add(amount.minor()),
                        )
                        .col_expr(expense_splits::Column::IsSettled, Expr::value(settled))
                        .filter(expense_splits::Column::Id.eq(split_id))
                        .filter(expense_splits::Column::IsSettled.eq(false))
                        .filter(expense_splits::Column::AmountOwedMinor.eq(owed.minor()))
                        .exec(db_tx)
                        .await?;
                    if swapped.rows_affected == 0 {
                        return Err(EngineError::Conflict(format!(
                            "split {split_id} changed concurrently"
                        )));
                    }

                    let expense = engine.require_expense(db_tx, split.expense_id).await?;
                    let payee = expense.paid_by;

                    engine.debit_wallet(db_tx, user_id, amount).await?;
                    engine.credit_wallet(db_tx, payee, amount).await?;

                    let now = engine.clock.now();
                    engine
                        .append_ledger(
                            db_tx,
                            &NewLedgerEntry {
                                user_id,
                                direction: Direction::Debit,
                                category: LedgerCategory::Split,
                                amount,
                                reference: engine.references.split_reference(),
                                description: format!("Payment for split #{split_id}"),
                                created_at: now,
                            },
                        )
                        .await?;
                    engine
                        .append_ledger(
                            db_tx,
                            &NewLedgerEntry {
                                user_id: payee,
                                direction: Direction::Credit,
                                category: LedgerCategory::Split,
                                amount,
                                reference: engine.references.split_reference(),
                                description: format!("Received payment for split #{split_id}"),
                                created_at: now,
                            },
                        )
                        .await?;

                    let payer = engine.require_user(db_tx, user_id).await?;
                    let receiver = engine.require_user(db_tx, payee).await?;
                    let group_name = groups::Entity::find_by_id(expense.group_id)
                        .one(db_tx)
                        .await?
                        .map(|g| g.name)
                        .unwrap_or_default();

                    tracing::info!(
                        split_id,
                        from = user_id,
                        to = payee,
                        amount = %amount,
                        remaining = %remaining,
                        "split settled"
                    );

                    let notification = Notification::new(
                        receiver.email,
                        format!("You've been paid for split #{split_id}"),
                        format!(
                            "{} paid you {amount} in {group_name} for \"{}\".",
                            payer.first_name, expense.description
                        ),
                    );
                    Ok((
                        SettlementOutcome {
                            split_id,
                            remaining_owed: remaining,
                            is_fully_settled: settled,
                        },
                        notification,
                    ))
                })
            })
            .await?;

        self.notify(notification);
        Ok(outcome)
    }
}
