//! Expense splits: one member's obligation arising from a shared expense.
//!
//! A split moves through `Open → PartiallySettled → Settled`. `Settled` is
//! terminal and is reached exactly when `amount_owed` hits zero. Splits are
//! never deleted by settlement.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitState {
    Open,
    PartiallySettled,
    Settled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub id: i64,
    pub expense_id: i64,
    pub owed_by: i64,
    pub amount_owed: Money,
    /// Running total already paid down through settlements.
    pub amount_paid: Money,
    pub is_settled: bool,
    pub created_at: DateTime<Utc>,
}

impl ExpenseSplit {
    pub fn state(&self) -> SplitState {
        if self.is_settled {
            SplitState::Settled
        } else if self.amount_paid.is_positive() {
            SplitState::PartiallySettled
        } else {
            SplitState::Open
        }
    }

    /// Whether any money already moved against this split.
    pub fn has_settlement_history(&self) -> bool {
        self.amount_paid.is_positive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "group_expense_splits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub expense_id: i64,
    pub owed_by: i64,
    pub amount_owed_minor: i64,
    pub amount_paid_minor: i64,
    pub is_settled: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expense,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwedBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Debtor,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ExpenseSplit {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            expense_id: model.expense_id,
            owed_by: model.owed_by,
            amount_owed: Money::new(model.amount_owed_minor),
            amount_paid: Money::new(model.amount_paid_minor),
            is_settled: model.is_settled,
            created_at: model.created_at,
        }
    }
}

pub(crate) fn new_active(
    expense_id: i64,
    owed_by: i64,
    amount_owed: Money,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        expense_id: ActiveValue::Set(expense_id),
        owed_by: ActiveValue::Set(owed_by),
        amount_owed_minor: ActiveValue::Set(amount_owed.minor()),
        amount_paid_minor: ActiveValue::Set(0),
        // A zero share (tiny expense, many members) has nothing to pay down.
        is_settled: ActiveValue::Set(amount_owed.is_zero()),
        created_at: ActiveValue::Set(created_at),
    }
}
