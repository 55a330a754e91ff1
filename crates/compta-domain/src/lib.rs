//! compta-domain
//!
//! Pure bookkeeping models (MonthKey, Account, LedgerEntry, RecurringTemplate).
//! No I/O, no caching, no balance tracking. Only data types and their invariants.

pub mod account;
pub mod common;
pub mod entry;
pub mod error;
pub mod month;
pub mod template;

pub use account::*;
pub use common::*;
pub use entry::*;
pub use error::DomainError;
pub use month::MonthKey;
pub use template::*;

pub use rust_decimal::Decimal;
