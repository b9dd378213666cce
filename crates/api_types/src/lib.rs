//! Request and response bodies of the HTTP API.
//!
//! Money always travels as integer minor units (`*_minor` fields).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupCreated {
        pub id: i64,
    }

    /// Add an existing user by username. Admins only.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberAdd {
        pub username: String,
    }
}

pub mod expense {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        #[serde(default)]
        pub description: String,
        /// Must be > 0.
        pub amount_minor: i64,
    }

    /// Partial update; at least one field must be present.
    ///
    /// A new amount regenerates the splits and is refused once any split
    /// has been paid down.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub description: Option<String>,
        pub amount_minor: Option<i64>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SplitState {
        Open,
        PartiallySettled,
        Settled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub id: i64,
        pub owed_by: i64,
        pub amount_owed_minor: i64,
        pub amount_paid_minor: i64,
        pub state: SplitState,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: i64,
        pub group_id: i64,
        pub paid_by: i64,
        pub description: String,
        pub amount_minor: i64,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseDetailResponse {
        pub expense: ExpenseView,
        /// What the payer covers, rounding remainder included.
        pub payer_share_minor: i64,
        pub splits: Vec<SplitView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub expenses: Vec<ExpenseView>,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleRequest {
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleResponse {
        pub split_id: i64,
        pub remaining_owed_minor: i64,
        pub is_fully_settled: bool,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub user_id: i64,
        pub username: String,
        pub total_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub balances: Vec<BalanceView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupSummaryResponse {
        pub group_id: i64,
        pub group_name: String,
        pub debtors: Vec<BalanceView>,
    }
}

pub mod invitation {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InviteRequest {
        pub email: String,
        /// Defaults to seven days.
        pub ttl_hours: Option<i64>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum InvitationStatus {
        Pending,
        Accepted,
        Expired,
        Revoked,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationView {
        pub id: i64,
        pub group_id: i64,
        pub email: String,
        pub status: InvitationStatus,
        pub expires_at: DateTime<Utc>,
    }

    /// Creation response. `token` is shown only here.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationCreated {
        pub invitation: InvitationView,
        pub token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationListResponse {
        pub invitations: Vec<InvitationView>,
    }
}

pub mod wallet {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletView {
        pub balance_minor: i64,
        pub last_funded_at: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Direction {
        Debit,
        Credit,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerEntryView {
        pub id: i64,
        pub direction: Direction,
        pub category: String,
        pub amount_minor: i64,
        pub status: String,
        pub reference: String,
        pub description: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerResponse {
        pub transactions: Vec<LedgerEntryView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerQuery {
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundRequest {
        /// Must be > 0.
        pub amount_minor: i64,
    }

    /// Where to send the user to complete the payment.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundResponse {
        pub authorization_url: String,
        pub access_code: String,
        pub reference: String,
    }
}
