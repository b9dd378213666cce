//! Shared-expense ledger and settlement engine.
//!
//! Groups log expenses, the [`allocate_splits`] allocator turns each one into
//! per-member obligations, and [`Engine::settle_split`] pays those down by
//! moving money between internal wallets. External top-ups arrive as signed
//! provider events and are reconciled idempotently by
//! [`Engine::reconcile_funding`]. Every mutation is one database transaction
//! bounded by a timeout.

pub use clock::{Clock, SystemClock};
pub use commands::{ExpenseCmd, ExpenseUpdate, InviteCmd, SettleCmd};
pub use error::EngineError;
pub use expense_splits::{ExpenseSplit, SplitState};
pub use expenses::{Expense, ExpenseDetail};
pub use funding::{
    FundingEvent, FundingOutcome, ProviderEvent, SIGNATURE_HEADER, WebhookVerifier, parse_event,
};
pub use group_members::MemberRole;
pub use groups::Group;
pub use invitations::{Invitation, InvitationStatus, IssuedInvitation};
pub use money::Money;
pub use notify::{Notification, NotificationPool, Notifier, NotifyError, TracingNotifier};
pub use ops::{
    Balance, Engine, EngineBuilder, GroupBalance, NewUser, ReminderReport, SettlementOutcome,
};
pub use references::{RandomReferences, ReferenceGenerator, hash_token};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use split::{Allocation, allocate_splits};
pub use transactions::{Direction, LedgerCategory, LedgerEntry};
pub use users::password_hash;
pub use wallets::Wallet;

mod clock;
mod commands;
mod error;
mod expense_splits;
mod expenses;
mod funding;
mod group_members;
mod groups;
mod invitations;
mod money;
mod notify;
mod ops;
mod references;
mod scheduler;
mod split;
mod transactions;
mod users;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
