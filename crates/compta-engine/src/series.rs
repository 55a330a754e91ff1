//! Sparse monthly series with carry-forward lookup.

use std::collections::{BTreeMap, HashMap};

use compta_domain::{AccountId, MonthKey};
use rust_decimal::Decimal;

/// Sparse month -> value mapping. The effective value at a month is the value
/// stored at the greatest month not after it; before the first stored month
/// there is no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiviSeries {
    values: BTreeMap<MonthKey, Decimal>,
}

impl SuiviSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective (carried-forward) value at `month`.
    pub fn get(&self, month: MonthKey) -> Option<Decimal> {
        self.values
            .range(..=month)
            .next_back()
            .map(|(_, value)| *value)
    }

    /// Value stored at exactly `month`.
    pub fn get_exact(&self, month: MonthKey) -> Option<Decimal> {
        self.values.get(&month).copied()
    }

    pub fn set(&mut self, month: MonthKey, value: Decimal) {
        self.values.insert(month, value);
    }

    /// Adds `delta` at `month`. A running series starts from the effective
    /// value; a monthly one starts from what is stored at exactly `month`.
    pub fn add(&mut self, month: MonthKey, delta: Decimal, running: bool) {
        let base = if running {
            self.get(month)
        } else {
            self.get_exact(month)
        };
        self.values
            .insert(month, base.unwrap_or(Decimal::ZERO) + delta);
    }

    /// Drops every stored value at `month` or later.
    pub fn truncate_from(&mut self, month: MonthKey) {
        self.values.retain(|stored, _| *stored < month);
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonthKey, Decimal)> + '_ {
        self.values.iter().map(|(month, value)| (*month, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    /// Projected running balance.
    Historique,
    /// Cleared running balance.
    SoldeAVue,
    /// Rolling average of `Historique`.
    Moyenne,
}

/// The three series tracked for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSeries {
    pub historique: SuiviSeries,
    pub solde_a_vue: SuiviSeries,
    pub moyenne: SuiviSeries,
}

impl AccountSeries {
    pub fn get(&self, kind: SeriesKind) -> &SuiviSeries {
        match kind {
            SeriesKind::Historique => &self.historique,
            SeriesKind::SoldeAVue => &self.solde_a_vue,
            SeriesKind::Moyenne => &self.moyenne,
        }
    }

    pub fn get_mut(&mut self, kind: SeriesKind) -> &mut SuiviSeries {
        match kind {
            SeriesKind::Historique => &mut self.historique,
            SeriesKind::SoldeAVue => &mut self.solde_a_vue,
            SeriesKind::Moyenne => &mut self.moyenne,
        }
    }

    fn truncate_from(&mut self, month: MonthKey) {
        self.historique.truncate_from(month);
        self.solde_a_vue.truncate_from(month);
        self.moyenne.truncate_from(month);
    }
}

/// Series of every account. Written only by the balance tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesBook {
    accounts: HashMap<AccountId, AccountSeries>,
}

impl SeriesBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, account: AccountId) -> Option<&AccountSeries> {
        self.accounts.get(&account)
    }

    pub fn account_mut(&mut self, account: AccountId) -> &mut AccountSeries {
        self.accounts.entry(account).or_default()
    }

    /// Effective value of one series, `None` when the account has no history
    /// up to `month`.
    pub fn value(&self, account: AccountId, kind: SeriesKind, month: MonthKey) -> Option<Decimal> {
        self.accounts
            .get(&account)
            .and_then(|series| series.get(kind).get(month))
    }

    pub fn truncate_from(&mut self, month: MonthKey) {
        for series in self.accounts.values_mut() {
            series.truncate_from(month);
        }
    }
}
