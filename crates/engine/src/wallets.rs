//! The module contains `Wallet` struct and its implementation.

use chrono::{DateTime, Utc};

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::Money;

/// A user's internal wallet.
///
/// There is exactly one wallet per user, created lazily the first time money
/// lands on it. The balance never goes negative: every debit is a
/// conditional update that only succeeds while the balance still covers it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: i64,
    pub balance: Money,
    pub last_funded_at: Option<DateTime<Utc>>,
}

impl Wallet {
    /// Snapshot for a user that never received money.
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            balance: Money::ZERO,
            last_funded_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub user_id: i64,
    pub balance_minor: i64,
    pub last_funded_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Wallet {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            balance: Money::new(model.balance_minor),
            last_funded_at: model.last_funded_at,
        }
    }
}

pub(crate) fn new_active(user_id: i64, created_at: DateTime<Utc>) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        user_id: ActiveValue::Set(user_id),
        balance_minor: ActiveValue::Set(0),
        last_funded_at: ActiveValue::Set(None),
        created_at: ActiveValue::Set(created_at),
    }
}
