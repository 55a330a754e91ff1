//! Day-level balance reconstruction and critical balance detection.
//!
//! Only month-end values are stored, so the days of a month are rebuilt
//! backward: starting from the month-end anchor, each day's own impact is
//! subtracted to get the balance that held the evening before.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use compta_domain::{AccountId, MonthKey};
use rust_decimal::Decimal;

use crate::{
    posting::{cleared_posting, net_effect},
    AccountTable, CoreError, LedgerCache, SeriesBook, SeriesKind,
};

/// End-of-day balances for every day of one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBalances {
    month: MonthKey,
    opening: Decimal,
    balances: BTreeMap<NaiveDate, Decimal>,
}

impl DailyBalances {
    pub fn month(&self) -> MonthKey {
        self.month
    }

    /// Balance before the first day of the month.
    pub fn opening(&self) -> Decimal {
        self.opening
    }

    pub fn closing(&self) -> Decimal {
        self.balances
            .values()
            .next_back()
            .copied()
            .unwrap_or(self.opening)
    }

    pub fn get(&self, date: NaiveDate) -> Option<Decimal> {
        self.balances.get(&date).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        self.balances.iter().map(|(date, value)| (*date, *value))
    }

    /// Days from `from` (inclusive) to the end of the month.
    pub fn tail(&self, from: NaiveDate) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        self.balances
            .range(from..)
            .map(|(date, value)| (*date, *value))
    }
}

/// The lowest projected balance over the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriticalSituation {
    /// First negative day when there is one, else the day the minimum is
    /// first reached.
    pub date: NaiveDate,
    /// Minimum balance over the horizon.
    pub value: Decimal,
    pub minimum_date: NaiveDate,
    pub first_negative: Option<NaiveDate>,
}

impl CriticalSituation {
    pub fn is_negative(&self) -> bool {
        self.first_negative.is_some()
    }
}

/// Read-only view over the cache and series. Never mutates anything.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionEngine<'a> {
    accounts: &'a AccountTable,
    cache: &'a LedgerCache,
    series: &'a SeriesBook,
}

impl<'a> ProjectionEngine<'a> {
    pub fn new(accounts: &'a AccountTable, cache: &'a LedgerCache, series: &'a SeriesBook) -> Self {
        Self {
            accounts,
            cache,
            series,
        }
    }

    /// End-of-day balances of `account` for every day of `month`, driven by
    /// entry dates or, with `use_cleared`, by clearing dates.
    pub fn daily_balances(
        &self,
        account: AccountId,
        month: MonthKey,
        use_cleared: bool,
    ) -> Result<DailyBalances, CoreError> {
        self.accounts.require(account)?;
        let kind = if use_cleared {
            SeriesKind::SoldeAVue
        } else {
            SeriesKind::Historique
        };
        let anchor = self
            .series
            .value(account, kind, month)
            .unwrap_or(Decimal::ZERO);

        let mut impacts: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        if use_cleared {
            for pointage in self.cache.pointages_between(month, month) {
                if pointage.entry.account(pointage.side) != account {
                    continue;
                }
                let posting = cleared_posting(&pointage.entry, pointage.side, self.accounts)?;
                *impacts.entry(pointage.date).or_default() += posting.amount;
            }
        } else {
            for entry in self.cache.entries_in(month) {
                let effect = net_effect(&entry, account, self.accounts)?;
                if !effect.is_zero() {
                    *impacts.entry(entry.date()).or_default() += effect;
                }
            }
        }

        let mut balances = BTreeMap::new();
        let mut balance = anchor;
        for day in month.days().rev() {
            balances.insert(day, balance);
            balance -= impacts.get(&day).copied().unwrap_or(Decimal::ZERO);
        }
        Ok(DailyBalances {
            month,
            opening: balance,
            balances,
        })
    }

    /// Scans projected balances from `reference` to the end of the following
    /// month and reports the minimum and the first negative day.
    pub fn critical_situation(
        &self,
        account: AccountId,
        reference: NaiveDate,
    ) -> Result<CriticalSituation, CoreError> {
        let month = MonthKey::from_date(reference);
        let current = self.daily_balances(account, month, false)?;
        let following = self.daily_balances(account, month.next(), false)?;

        let mut minimum: Option<(NaiveDate, Decimal)> = None;
        let mut first_negative = None;
        for (day, balance) in current.tail(reference).chain(following.iter()) {
            if minimum.map_or(true, |(_, lowest)| balance < lowest) {
                minimum = Some((day, balance));
            }
            if first_negative.is_none() && balance.is_sign_negative() && !balance.is_zero() {
                first_negative = Some(day);
            }
        }

        let (minimum_date, value) = minimum.unwrap_or((reference, current.closing()));
        Ok(CriticalSituation {
            date: first_negative.unwrap_or(minimum_date),
            value,
            minimum_date,
            first_negative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BalanceTracker, TrackerSettings};
    use compta_domain::{Account, AccountKind, EntrySide, LedgerEntry};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rebuilds_days_backward_from_month_end() {
        let mut accounts = AccountTable::new("Savings");
        let bank = accounts.insert(Account::new("Checking", AccountKind::Bank)).unwrap();
        let payer = accounts.insert(Account::new("Employer", AccountKind::Bank)).unwrap();
        let mut cache = LedgerCache::new();
        cache
            .insert(LedgerEntry::new(date(2024, 4, 1), payer, bank, dec!(1000)).unwrap())
            .unwrap();
        cache
            .insert(
                LedgerEntry::new(date(2024, 4, 10), bank, payer, dec!(250))
                    .unwrap()
                    .cleared(EntrySide::Debit, Some(date(2024, 4, 14))),
            )
            .unwrap();
        let settings = TrackerSettings::default();
        let series = BalanceTracker::new(&settings, &accounts, &cache)
            .recompute(&SeriesBook::new(), MonthKey::from_date(date(2024, 4, 1)), date(2024, 4, 30))
            .unwrap();

        let engine = ProjectionEngine::new(&accounts, &cache, &series);
        let april = MonthKey::from_date(date(2024, 4, 1));
        let days = engine.daily_balances(bank, april, false).unwrap();
        assert_eq!(days.iter().count(), 30);
        assert_eq!(days.opening(), Decimal::ZERO);
        assert_eq!(days.get(date(2024, 4, 1)), Some(dec!(1000)));
        assert_eq!(days.get(date(2024, 4, 9)), Some(dec!(1000)));
        assert_eq!(days.get(date(2024, 4, 10)), Some(dec!(750)));
        assert_eq!(days.closing(), dec!(750));
        assert_eq!(days.tail(date(2024, 4, 29)).count(), 2);

        let cleared = engine.daily_balances(bank, april, true).unwrap();
        assert_eq!(cleared.get(date(2024, 4, 13)), Some(Decimal::ZERO));
        assert_eq!(cleared.get(date(2024, 4, 14)), Some(dec!(-250)));
    }

    #[test]
    fn unknown_account_is_rejected() {
        let accounts = AccountTable::new("Savings");
        let cache = LedgerCache::new();
        let series = SeriesBook::new();
        let engine = ProjectionEngine::new(&accounts, &cache, &series);
        let stranger = AccountId::new();
        assert_eq!(
            engine
                .critical_situation(stranger, date(2024, 1, 1))
                .unwrap_err(),
            CoreError::AccountNotFound(stranger)
        );
    }
}
