//! Ledger transactions.
//!
//! A [`LedgerEntry`] is an immutable record of a single monetary movement on
//! one user's wallet. Rows are only ever inserted. The `reference` column is
//! globally unique and doubles as the idempotency key for provider events.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(EngineError::InvalidPayload(format!(
                "invalid transaction direction: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCategory {
    /// Wallet-to-wallet movement paying down an expense split.
    Split,
    /// External funding confirmed by the payment provider.
    Fund,
}

impl LedgerCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Fund => "fund",
        }
    }
}

impl TryFrom<&str> for LedgerCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "split" => Ok(Self::Split),
            "fund" => Ok(Self::Fund),
            other => Err(EngineError::InvalidPayload(format!(
                "invalid transaction category: {other}"
            ))),
        }
    }
}

pub(crate) const STATUS_SUCCESS: &str = "success";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub direction: Direction,
    pub category: LedgerCategory,
    pub amount: Money,
    pub status: String,
    pub reference: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub direction: String,
    pub category: String,
    pub amount_minor: i64,
    pub status: String,
    #[sea_orm(unique)]
    pub reference: String,
    pub description: String,
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

impl ActiveModelBehavior for ActiveModel {}

/// Values for a ledger row about to be appended.
#[derive(Clone, Debug)]
pub(crate) struct NewLedgerEntry {
    pub user_id: i64,
    pub direction: Direction,
    pub category: LedgerCategory,
    pub amount: Money,
    pub reference: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<&NewLedgerEntry> for ActiveModel {
    fn from(entry: &NewLedgerEntry) -> Self {
        Self {
            id: ActiveValue::NotSet,
            user_id: ActiveValue::Set(entry.user_id),
            direction: ActiveValue::Set(entry.direction.as_str().to_string()),
            category: ActiveValue::Set(entry.category.as_str().to_string()),
            amount_minor: ActiveValue::Set(entry.amount.minor()),
            status: ActiveValue::Set(STATUS_SUCCESS.to_string()),
            reference: ActiveValue::Set(entry.reference.clone()),
            description: ActiveValue::Set(entry.description.clone()),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            direction: Direction::try_from(model.direction.as_str())?,
            category: LedgerCategory::try_from(model.category.as_str())?,
            amount: Money::new(model.amount_minor),
            status: model.status,
            reference: model.reference,
            description: model.description,
            created_at: model.created_at,
        })
    }
}
