//! Shared expenses.
//!
//! An [`Expense`] is paid by one group member and split between the others
//! through [`ExpenseSplit`](crate::ExpenseSplit) rows. The payer's own share
//! is never stored: it is whatever the splits do not cover.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{ExpenseSplit, Money};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub group_id: i64,
    pub paid_by: i64,
    pub description: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

/// An expense together with its current splits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDetail {
    pub expense: Expense,
    pub splits: Vec<ExpenseSplit>,
}

impl ExpenseDetail {
    /// The payer's implicit share: the part of the expense not covered by
    /// any split.
    pub fn payer_share(&self) -> Money {
        let allocated: Money = self
            .splits
            .iter()
            .map(|s| s.amount_owed + s.amount_paid)
            .sum();
        self.expense.amount - allocated
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "group_expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub group_id: i64,
    pub paid_by: i64,
    pub description: String,
    pub amount_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Group,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::PaidBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Payer,
    #[sea_orm(has_many = "super::expense_splits::Entity")]
    Splits,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::expense_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Splits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Expense {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            group_id: model.group_id,
            paid_by: model.paid_by,
            description: model.description,
            amount: Money::new(model.amount_minor),
            created_at: model.created_at,
        }
    }
}

pub(crate) fn new_active(
    group_id: i64,
    paid_by: i64,
    description: String,
    amount: Money,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        group_id: ActiveValue::Set(group_id),
        paid_by: ActiveValue::Set(paid_by),
        description: ActiveValue::Set(description),
        amount_minor: ActiveValue::Set(amount.minor()),
        created_at: ActiveValue::Set(created_at),
    }
}
