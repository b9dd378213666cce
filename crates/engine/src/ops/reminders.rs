use std::{sync::Arc, time::Duration};

use sea_orm::{FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use tokio::{task::JoinSet, time::Instant};

use crate::{Money, Notification, ResultEngine, expense_splits, expenses, groups, users};

use super::Engine;

/// Outcome of one reminder batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Sends still in flight when the batch deadline passed.
    pub abandoned: usize,
}

#[derive(Debug, FromQueryResult)]
struct DebtRow {
    debtor_id: i64,
    email: String,
    first_name: String,
    expense_id: i64,
    description: String,
    group_name: String,
    total_minor: i64,
}

impl DebtRow {
    fn into_notification(self) -> Notification {
        let amount = Money::new(self.total_minor);
        let title = if self.description.is_empty() {
            format!("expense #{}", self.expense_id)
        } else {
            format!("'{}'", self.description)
        };
        Notification::new(
            self.email,
            format!("Reminder: you still owe {amount} for {title}"),
            format!(
                "Hi {}, you still owe {amount} for {title} in {}.",
                self.first_name, self.group_name
            ),
        )
    }
}

impl Engine {
    /// Remind every debtor of what they still owe, one message per
    /// (debtor, expense).
    ///
    /// Messages go out concurrently and the batch waits for all of them.
    /// Individual failures are logged and counted, never propagated.
    pub async fn send_debtor_reminders(&self) -> ResultEngine<ReminderReport> {
        self.remind_debtors(None).await
    }

    /// Like [`Engine::send_debtor_reminders`], but stops waiting after
    /// `budget`: sends still in flight are aborted and counted as abandoned.
    pub async fn send_debtor_reminders_within(
        &self,
        budget: Duration,
    ) -> ResultEngine<ReminderReport> {
        self.remind_debtors(Some(Instant::now() + budget)).await
    }

    async fn remind_debtors(&self, deadline: Option<Instant>) -> ResultEngine<ReminderReport> {
        let rows = self
            .with_tx(|_engine, db_tx| {
                Box::pin(async move {
                    expense_splits::Entity::find()
                        .select_only()
                        .column_as(expense_splits::Column::OwedBy, "debtor_id")
                        .column_as(users::Column::Email, "email")
                        .column_as(users::Column::FirstName, "first_name")
                        .column_as(expense_splits::Column::ExpenseId, "expense_id")
                        .column_as(expenses::Column::Description, "description")
                        .column_as(groups::Column::Name, "group_name")
                        .column_as(expense_splits::Column::AmountOwedMinor.sum(), "total_minor")
                        .join(JoinType::InnerJoin, expense_splits::Relation::Expense.def())
                        .join(JoinType::InnerJoin, expenses::Relation::Group.def())
                        .join(JoinType::InnerJoin, expense_splits::Relation::Debtor.def())
                        .filter(expense_splits::Column::IsSettled.eq(false))
                        .group_by(expense_splits::Column::OwedBy)
                        .group_by(expense_splits::Column::ExpenseId)
                        .group_by(users::Column::Email)
                        .group_by(users::Column::FirstName)
                        .group_by(expenses::Column::Description)
                        .group_by(groups::Column::Name)
                        .order_by_asc(expense_splits::Column::OwedBy)
                        .order_by_asc(expense_splits::Column::ExpenseId)
                        .into_model::<DebtRow>()
                        .all(db_tx)
                        .await
                        .map_err(Into::into)
                })
            })
            .await?;

        let mut report = ReminderReport::default();
        let mut sends = JoinSet::new();
        for row in rows.into_iter().filter(|r| r.total_minor > 0) {
            let notifier = Arc::clone(&self.notifier);
            let debtor_id = row.debtor_id;
            let expense_id = row.expense_id;
            let notification = row.into_notification();
            report.attempted += 1;
            sends.spawn(async move {
                let result = notifier.send(&notification).await;
                (debtor_id, expense_id, result)
            });
        }

        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, sends.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        report.abandoned = sends.len();
                        sends.abort_all();
                        tracing::warn!(
                            attempted = report.attempted,
                            delivered = report.delivered,
                            failed = report.failed,
                            abandoned = report.abandoned,
                            "reminder batch hit its deadline"
                        );
                        break;
                    }
                },
                None => sends.join_next().await,
            };
            let Some(joined) = next else { break };
            match joined {
                Ok((_, _, Ok(()))) => report.delivered += 1,
                Ok((debtor_id, expense_id, Err(err))) => {
                    report.failed += 1;
                    tracing::warn!(debtor_id, expense_id, "reminder not delivered: {err}");
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!("reminder task failed: {err}");
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            abandoned = report.abandoned,
            "debtor reminders sent"
        );
        Ok(report)
    }
}
