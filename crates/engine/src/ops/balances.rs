//! Read-only aggregation of unsettled obligations.
//!
//! Nothing here writes. Every query sums `amount_owed` of splits that are
//! not settled yet, grouped by the counterparty.

use sea_orm::{
    DatabaseTransaction, FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect,
    prelude::*,
    sea_query::{Expr, SimpleExpr},
};
use serde::{Deserialize, Serialize};

use crate::{Money, ResultEngine, expense_splits, expenses, users};

use super::Engine;

/// Total owed between the requester and one counterparty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: i64,
    pub username: String,
    pub total: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBalance {
    pub group_id: i64,
    pub group_name: String,
    /// One entry per debtor with something outstanding in the group.
    pub debtors: Vec<Balance>,
}

#[derive(Debug, FromQueryResult)]
struct BalanceRow {
    user_id: i64,
    username: String,
    total_minor: i64,
}

impl From<BalanceRow> for Balance {
    fn from(row: BalanceRow) -> Self {
        Self {
            user_id: row.user_id,
            username: row.username,
            total: Money::new(row.total_minor),
        }
    }
}

/// Who the debt is grouped by.
#[derive(Clone, Copy)]
enum Counterparty {
    Payer,
    Debtor,
}

impl Engine {
    /// What the requester still owes, per payer.
    pub async fn balances_owed(&self, user_id: i64) -> ResultEngine<Vec<Balance>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine
                    .unsettled_by(
                        db_tx,
                        Counterparty::Payer,
                        expense_splits::Column::OwedBy.eq(user_id),
                    )
                    .await
            })
        })
        .await
    }

    /// What others still owe the requester, per debtor.
    pub async fn balances_owed_to(&self, user_id: i64) -> ResultEngine<Vec<Balance>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine
                    .unsettled_by(
                        db_tx,
                        Counterparty::Debtor,
                        expenses::Column::PaidBy.eq(user_id),
                    )
                    .await
            })
        })
        .await
    }

    /// Outstanding debt per member of one group. Members only.
    pub async fn group_summary(&self, group_id: i64, user_id: i64) -> ResultEngine<GroupBalance> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let (group, _) = engine.require_member(db_tx, group_id, user_id).await?;
                let debtors = engine
                    .unsettled_by(
                        db_tx,
                        Counterparty::Debtor,
                        expenses::Column::GroupId.eq(group_id),
                    )
                    .await?;
                Ok(GroupBalance {
                    group_id,
                    group_name: group.name,
                    debtors,
                })
            })
        })
        .await
    }

    async fn unsettled_by(
        &self,
        db: &DatabaseTransaction,
        counterparty: Counterparty,
        scope: SimpleExpr,
    ) -> ResultEngine<Vec<Balance>> {
        let (id_column, user_join): (SimpleExpr, _) = match counterparty {
            Counterparty::Payer => (
                Expr::col((expenses::Entity, expenses::Column::PaidBy)).into(),
                expenses::Relation::Payer.def(),
            ),
            Counterparty::Debtor => (
                Expr::col((expense_splits::Entity, expense_splits::Column::OwedBy)).into(),
                expense_splits::Relation::Debtor.def(),
            ),
        };

        let rows = expense_splits::Entity::find()
            .select_only()
            .column_as(id_column.clone(), "user_id")
            .column_as(users::Column::Username, "username")
            .column_as(expense_splits::Column::AmountOwedMinor.sum(), "total_minor")
            .join(JoinType::InnerJoin, expense_splits::Relation::Expense.def())
            .join(JoinType::InnerJoin, user_join)
            .filter(expense_splits::Column::IsSettled.eq(false))
            .filter(scope)
            .group_by(id_column.clone())
            .group_by(users::Column::Username)
            .order_by_asc(id_column)
            .into_model::<BalanceRow>()
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .map(Balance::from)
            .filter(|b| b.total.is_positive())
            .collect())
    }
}
