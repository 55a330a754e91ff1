use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::AccountId;

/// Construction failures for domain values. A value that fails here never
/// reaches the ledger cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Debit and credit reference the same account: {0}")]
    SameAccount(AccountId),
    #[error("Amount must be strictly positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("Month out of range: {0}")]
    InvalidMonth(u32),
    #[error("Day {day} out of range for month {month}")]
    InvalidDay { month: u32, day: u32 },
    #[error("Unparseable month key: {0}")]
    InvalidMonthKey(String),
}
