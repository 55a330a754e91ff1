//! compta-engine
//!
//! Ledger cache and balance-tracking engine.
//! Depends on compta-domain. No terminal I/O, no persistence, no global state:
//! everything hangs off an explicit [`Ledger`] value.

pub mod accounts;
pub mod cache;
pub mod error;
pub mod ledger;
pub mod posting;
pub mod projection;
pub mod scheduler;
pub mod series;
pub mod time;
pub mod tracker;


pub use accounts::AccountTable;
pub use cache::{LedgerCache, Pointage};
pub use error::CoreError;
pub use ledger::Ledger;
pub use projection::{CriticalSituation, DailyBalances, ProjectionEngine};
pub use scheduler::{GenerationPlan, TemplateTable};
pub use series::{AccountSeries, SeriesBook, SeriesKind, SuiviSeries};
pub use time::{Clock, FixedClock, SystemClock};
pub use tracker::{BalanceTracker, TrackerSettings};
