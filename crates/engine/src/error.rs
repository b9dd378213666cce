//! The module contains the error the engine can throw.
//!
//! Every error raised inside a unit of work rolls the whole unit back, so a
//! caller never observes a partial mutation. The notable variants are:
//!
//! - [`Validation`] thrown for malformed non-monetary input (emails, empty
//!   names, durations).
//! - [`InsufficientFunds`] thrown when a wallet cannot cover a debit.
//! - [`KeyNotFound`] thrown when an item is not found (or not visible).
//! - [`Conflict`] thrown when a concurrent writer won the race or the
//!   requested transition is not allowed from the current state.
//! - [`Database`] wraps store failures; callers surface it as a generic
//!   internal error.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Conflict`]: EngineError::Conflict
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("No members to split the expense with")]
    NoMembersToSplit,
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Bad metadata: {0}")]
    BadMetadata(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Operation timed out: {0}")]
    Timeout(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NoMembersToSplit, Self::NoMembersToSplit) => true,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::BadMetadata(a), Self::BadMetadata(b)) => a == b,
            (Self::InvalidPayload(a), Self::InvalidPayload(b)) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
