#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use compta_core::{
    domain::{Account, AccountId, AccountKind, LedgerEntry, MonthKey},
    engine::FixedClock,
    ConfigManager, LedgerManager,
};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Config manager backed by a unique directory for each test.
pub fn config_manager() -> ConfigManager {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    ConfigManager::with_base_dir(base).expect("create config manager for temp dir")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn month(y: i32, m: u32) -> MonthKey {
    MonthKey::new(y, m).expect("valid month")
}

pub fn entry(on: NaiveDate, debit: AccountId, credit: AccountId, amount: Decimal) -> LedgerEntry {
    LedgerEntry::new(on, debit, credit, amount).expect("valid entry")
}

pub struct Household {
    pub manager: LedgerManager,
    pub checking: AccountId,
    pub employer: AccountId,
    pub landlord: AccountId,
    pub groceries: AccountId,
}

/// Manager pinned to 2024-03-10 with a few standard accounts.
pub fn household() -> Household {
    let config = config_manager().load().expect("load default config");
    let manager = LedgerManager::with_clock(&config, Arc::new(FixedClock(date(2024, 3, 10))));
    let accounts = [
        Account::new("Checking", AccountKind::Bank),
        Account::new("Employer", AccountKind::Bank),
        Account::new("Landlord", AccountKind::Bank),
        Account::new("Groceries", AccountKind::Budget),
    ];
    let ids: Vec<AccountId> = accounts.iter().map(Account::id).collect();
    manager.load_accounts(accounts).expect("load accounts");
    Household {
        manager,
        checking: ids[0],
        employer: ids[1],
        landlord: ids[2],
        groceries: ids[3],
    }
}
