//! Cascading recomputation of the monthly series after a cache mutation.
//!
//! A pass erases every stored value from the earliest affected month onward
//! and replays the cache from there: entries in `(date, id)` order into
//! `historique`, cleared sides in clearing-date order into `soldeAVue`, then
//! the rolling average of budget-like accounts up to the current month. The
//! pass works on a staged copy of the series, so a failing pass leaves the
//! committed series untouched.

use std::collections::VecDeque;

use chrono::NaiveDate;
use compta_domain::{round_half_up, AccountId, MonthKey};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::{
    posting::{cleared_posting, postings},
    AccountTable, CoreError, LedgerCache, SeriesBook,
};

/// Tunables of the rolling average.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Months in the rolling window; also the divisor of the average.
    pub average_window: usize,
    /// Decimal places of the rounded average.
    pub average_scale: u32,
    /// Store zero averages instead of skipping them.
    pub store_zero_averages: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            average_window: 12,
            average_scale: 2,
            store_zero_averages: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BalanceTracker<'a> {
    settings: &'a TrackerSettings,
    accounts: &'a AccountTable,
    cache: &'a LedgerCache,
}

impl<'a> BalanceTracker<'a> {
    pub fn new(
        settings: &'a TrackerSettings,
        accounts: &'a AccountTable,
        cache: &'a LedgerCache,
    ) -> Self {
        Self {
            settings,
            accounts,
            cache,
        }
    }

    /// Recomputes `series` from `from` onward and returns the new book. The
    /// average is brought up to the month containing `today`.
    pub fn recompute(
        &self,
        series: &SeriesBook,
        from: MonthKey,
        today: NaiveDate,
    ) -> Result<SeriesBook, CoreError> {
        let mut staged = series.clone();
        staged.truncate_from(from);

        let entries = self.cache.all_since(from);
        for entry in &entries {
            let month = entry.month();
            let entry_postings = postings(entry, self.accounts).map_err(|err| {
                warn!(entry = ?entry.id(), %err, "aborting balance pass");
                err
            })?;
            for posting in entry_postings {
                staged.account_mut(posting.account).historique.add(
                    month,
                    posting.amount,
                    posting.kind.is_running_balance(),
                );
            }
        }

        let pointages = self.cache.pointages_since(from);
        for pointage in &pointages {
            let posting = cleared_posting(&pointage.entry, pointage.side, self.accounts)?;
            if posting.kind.tracks_cleared() {
                staged.account_mut(posting.account).solde_a_vue.add(
                    MonthKey::from_date(pointage.date),
                    posting.amount,
                    true,
                );
            }
        }

        let current = MonthKey::from_date(today);
        let mut averaged = 0usize;
        for account in self.accounts.iter() {
            if account.kind.tracks_average() {
                self.recompute_average(&mut staged, account.id(), from, current);
                averaged += 1;
            }
        }

        debug!(
            from = %from,
            entries = entries.len(),
            pointages = pointages.len(),
            averaged,
            "balance pass complete"
        );
        Ok(staged)
    }

    fn recompute_average(
        &self,
        book: &mut SeriesBook,
        account: AccountId,
        from: MonthKey,
        current: MonthKey,
    ) {
        let window_len = self.settings.average_window.max(1);
        let divisor = Decimal::from(window_len as u64);
        let series = book.account_mut(account);

        let lookback = i32::try_from(window_len - 1).unwrap_or(i32::MAX);
        let mut window: VecDeque<Decimal> = from
            .translate(-lookback)
            .through(from.previous())
            .map(|month| series.historique.get_exact(month).unwrap_or(Decimal::ZERO))
            .collect();

        for month in from.through(current) {
            window.push_back(series.historique.get_exact(month).unwrap_or(Decimal::ZERO));
            while window.len() > window_len {
                window.pop_front();
            }
            let total: Decimal = window.iter().copied().sum();
            let average = round_half_up(total / divisor, self.settings.average_scale);
            if !average.is_zero() || self.settings.store_zero_averages {
                series.moyenne.set(month, average);
            }
        }
    }
}
