//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expense create/edit,
//! settlement, invitations), keeping call sites readable and avoiding long
//! argument lists.

use chrono::Duration;

use crate::Money;

/// Log a new shared expense paid by `paid_by`.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub group_id: i64,
    pub paid_by: i64,
    pub description: String,
    pub amount: Money,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(group_id: i64, paid_by: i64, amount: Money) -> Self {
        Self {
            group_id,
            paid_by,
            description: String::new(),
            amount,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update of an expense.
///
/// Only two fields are mutable. Changing `amount` regenerates the splits
/// from the current membership; changing `description` leaves them alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    pub amount: Option<Money>,
}

impl ExpenseUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.amount.is_none()
    }
}

/// Pay down part or all of a split from the debtor's wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettleCmd {
    pub split_id: i64,
    pub user_id: i64,
    pub amount: Money,
}

impl SettleCmd {
    #[must_use]
    pub fn new(split_id: i64, user_id: i64, amount: Money) -> Self {
        Self {
            split_id,
            user_id,
            amount,
        }
    }
}

/// Invite someone to a group by email.
#[derive(Clone, Debug)]
pub struct InviteCmd {
    pub group_id: i64,
    pub inviter: i64,
    pub email: String,
    pub ttl: Duration,
}

impl InviteCmd {
    pub const DEFAULT_TTL_DAYS: i64 = 7;

    #[must_use]
    pub fn new(group_id: i64, inviter: i64, email: impl Into<String>) -> Self {
        Self {
            group_id,
            inviter,
            email: email.into(),
            ttl: Duration::days(Self::DEFAULT_TTL_DAYS),
        }
    }

    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}
