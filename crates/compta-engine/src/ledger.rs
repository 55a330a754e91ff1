//! The ledger context: accounts, entries, series and templates behind one
//! value, so a mutation and its balance pass form a single unit of work.

use std::{fmt, sync::Arc};

use chrono::NaiveDate;
use compta_domain::{
    Account, AccountId, Displayable, EntryId, LedgerEntry, MonthKey, RecurringTemplate,
    TemplateId,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::{
    projection::{CriticalSituation, DailyBalances, ProjectionEngine},
    scheduler::{generated_entry, GenerationPlan, TemplateTable},
    AccountTable, BalanceTracker, Clock, CoreError, LedgerCache, SeriesBook, SeriesKind,
    TrackerSettings,
};

pub struct Ledger {
    accounts: AccountTable,
    cache: LedgerCache,
    series: SeriesBook,
    templates: TemplateTable,
    settings: TrackerSettings,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("accounts", &self.accounts.len())
            .field("entries", &self.cache.len())
            .field("templates", &self.templates.len())
            .field("settings", &self.settings)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Ledger {
    pub fn new(
        settings: TrackerSettings,
        clock: Arc<dyn Clock>,
        savings_name: impl Into<String>,
    ) -> Self {
        Self {
            accounts: AccountTable::new(savings_name),
            cache: LedgerCache::new(),
            series: SeriesBook::new(),
            templates: TemplateTable::new(),
            settings,
            clock,
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ---- bulk load -------------------------------------------------------

    /// Adds accounts. Either every account is added or none is.
    pub fn load_accounts<I>(&mut self, accounts: I) -> Result<usize, CoreError>
    where
        I: IntoIterator<Item = Account>,
    {
        let mut staged = self.accounts.clone();
        let mut count = 0;
        for account in accounts {
            staged.insert(account)?;
            count += 1;
        }
        self.accounts = staged;
        info!(count, "loaded accounts");
        Ok(count)
    }

    /// Stores entries and runs one balance pass from the earliest month they
    /// touch. References are checked before anything is stored.
    pub fn load_entries<I>(&mut self, entries: I) -> Result<usize, CoreError>
    where
        I: IntoIterator<Item = LedgerEntry>,
    {
        let entries: Vec<LedgerEntry> = entries.into_iter().collect();
        for entry in &entries {
            self.check_references(entry)?;
        }
        let Some(from) = entries.iter().map(LedgerEntry::earliest_month).min() else {
            return Ok(0);
        };

        let mut staged = self.cache.clone();
        for entry in entries.iter().cloned() {
            staged.insert(entry)?;
        }
        let series = BalanceTracker::new(&self.settings, &self.accounts, &staged).recompute(
            &self.series,
            from,
            self.clock.today(),
        )?;
        self.cache = staged;
        self.series = series;
        info!(count = entries.len(), from = %from, "loaded entries");
        Ok(entries.len())
    }

    /// Adds recurring templates after checking their account references.
    /// Accounts are never removed, so generation relies on this check.
    /// Dependencies are only resolved at generation time.
    pub fn load_templates<I>(&mut self, templates: I) -> Result<usize, CoreError>
    where
        I: IntoIterator<Item = RecurringTemplate>,
    {
        let mut staged = self.templates.clone();
        let mut count = 0;
        for template in templates {
            for account in [template.debit(), template.credit()] {
                self.accounts.require(account).map_err(|err| {
                    warn!(template = %template.id(), %err, "template references an unknown account");
                    err
                })?;
            }
            staged.insert(template)?;
            count += 1;
        }
        self.templates = staged;
        info!(count, "loaded recurring templates");
        Ok(count)
    }

    // ---- mutation --------------------------------------------------------

    /// Stores `entry`, assigning an identifier when it has none, and brings
    /// the series up to date.
    pub fn insert_entry(&mut self, entry: LedgerEntry) -> Result<EntryId, CoreError> {
        self.check_references(&entry)?;
        let stored = self.cache.insert(entry)?;
        let id = stored.id().ok_or(CoreError::MissingId)?;
        if let Err(err) = self.recompute(stored.earliest_month()) {
            self.cache.remove(id)?;
            return Err(err);
        }
        Ok(id)
    }

    /// Replaces the entry stored under `entry`'s identifier.
    pub fn update_entry(&mut self, entry: LedgerEntry) -> Result<(), CoreError> {
        self.check_references(&entry)?;
        let (old, new) = self.cache.update(entry)?;
        let from = old.earliest_month().min(new.earliest_month());
        if let Err(err) = self.recompute(from) {
            self.cache.update(LedgerEntry::clone(&old))?;
            return Err(err);
        }
        Ok(())
    }

    pub fn remove_entry(&mut self, id: EntryId) -> Result<Arc<LedgerEntry>, CoreError> {
        let removed = self.cache.remove(id)?;
        if let Err(err) = self.recompute(removed.earliest_month()) {
            self.cache.insert(LedgerEntry::clone(&removed))?;
            return Err(err);
        }
        Ok(removed)
    }

    /// Generates the recurring entries of `month`, replacing the ones a
    /// previous run generated for that month. On failure the cache and the
    /// series are left exactly as they were.
    pub fn generate_recurring(&mut self, month: MonthKey) -> Result<Vec<EntryId>, CoreError> {
        let mut plan = self.templates.plan(month)?;

        let cache_snapshot = self.cache.clone();
        let series_snapshot = self.series.clone();
        match self.run_plan(&mut plan) {
            Ok(generated) => {
                info!(month = %month, generated = generated.len(), "generated recurring entries");
                Ok(generated)
            }
            Err(err) => {
                warn!(month = %month, %err, "recurring generation aborted");
                self.cache.roll_back(cache_snapshot);
                self.series = series_snapshot;
                Err(err)
            }
        }
    }

    fn run_plan(&mut self, plan: &mut GenerationPlan) -> Result<Vec<EntryId>, CoreError> {
        let month = plan.month();
        let mut stale_from: Option<MonthKey> = None;
        for id in plan.order() {
            for entry in self.cache.generated_in(month, *id) {
                let id = entry.id().ok_or(CoreError::MissingId)?;
                self.cache.remove(id)?;
                let earliest = entry.earliest_month();
                stale_from = Some(stale_from.map_or(earliest, |from| from.min(earliest)));
            }
        }
        if let Some(from) = stale_from {
            debug!(month = %month, from = %from, "dropped previously generated entries");
            self.recompute(from)?;
        }

        let order = plan.order().to_vec();
        let mut generated = Vec::new();
        for id in order {
            let Some(template) = self.templates.get(id) else {
                continue;
            };
            let amount = plan.resolve(template, &self.accounts, &self.series)?;
            let Some(entry) = generated_entry(template, month, amount)? else {
                continue;
            };
            let stored = self.cache.insert(entry)?;
            let entry_id = stored.id().ok_or(CoreError::MissingId)?;
            debug!(template = %id, entry = %entry_id, amount = %stored.amount(), "generated entry");
            self.recompute(stored.earliest_month())?;
            generated.push(entry_id);
        }
        Ok(generated)
    }

    fn recompute(&mut self, from: MonthKey) -> Result<(), CoreError> {
        let series = BalanceTracker::new(&self.settings, &self.accounts, &self.cache).recompute(
            &self.series,
            from,
            self.clock.today(),
        )?;
        self.series = series;
        Ok(())
    }

    fn check_references(&self, entry: &LedgerEntry) -> Result<(), CoreError> {
        for (_, account) in entry.sides() {
            self.accounts.require(account).map_err(|err| {
                warn!(
                    entry = %entry.display_label(),
                    %err,
                    "entry references an unknown account"
                );
                err
            })?;
        }
        Ok(())
    }

    // ---- queries ---------------------------------------------------------

    pub fn cache(&self) -> &LedgerCache {
        &self.cache
    }

    pub fn series(&self) -> &SeriesBook {
        &self.series
    }

    pub fn accounts(&self) -> &AccountTable {
        &self.accounts
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn savings_account(&self) -> AccountId {
        self.accounts.savings()
    }

    pub fn templates(&self) -> &TemplateTable {
        &self.templates
    }

    pub fn template(&self, id: TemplateId) -> Option<&RecurringTemplate> {
        self.templates.get(id)
    }

    pub fn entry(&self, id: EntryId) -> Option<Arc<LedgerEntry>> {
        self.cache.get(id)
    }

    /// Entries touching `account` with months in `from..=to`. Savings-flagged
    /// entries count as touching the virtual savings account.
    pub fn entries_for_account(
        &self,
        account: AccountId,
        from: MonthKey,
        to: MonthKey,
    ) -> Result<Vec<Arc<LedgerEntry>>, CoreError> {
        self.accounts.require(account)?;
        let savings = account == self.accounts.savings();
        Ok(self
            .cache
            .all_between(from, to)
            .into_iter()
            .filter(|entry| entry.side_of(account).is_some() || (savings && entry.is_savings()))
            .collect())
    }

    /// Projected balance at the end of `month`; `None` before any history.
    pub fn historique(
        &self,
        account: AccountId,
        month: MonthKey,
    ) -> Result<Option<Decimal>, CoreError> {
        self.series_value(account, SeriesKind::Historique, month)
    }

    /// Cleared balance at the end of `month`.
    pub fn solde_a_vue(
        &self,
        account: AccountId,
        month: MonthKey,
    ) -> Result<Option<Decimal>, CoreError> {
        self.series_value(account, SeriesKind::SoldeAVue, month)
    }

    /// Rolling average of a budget account at `month`.
    pub fn moyenne(&self, account: AccountId, month: MonthKey) -> Result<Option<Decimal>, CoreError> {
        self.series_value(account, SeriesKind::Moyenne, month)
    }

    fn series_value(
        &self,
        account: AccountId,
        kind: SeriesKind,
        month: MonthKey,
    ) -> Result<Option<Decimal>, CoreError> {
        self.accounts.require(account)?;
        Ok(self.series.value(account, kind, month))
    }

    pub fn daily_balances(
        &self,
        account: AccountId,
        month: MonthKey,
        use_cleared: bool,
    ) -> Result<DailyBalances, CoreError> {
        self.projection().daily_balances(account, month, use_cleared)
    }

    pub fn critical_situation(
        &self,
        account: AccountId,
        reference: NaiveDate,
    ) -> Result<CriticalSituation, CoreError> {
        self.projection().critical_situation(account, reference)
    }

    /// Critical situation seen from the clock's current date.
    pub fn critical_situation_today(
        &self,
        account: AccountId,
    ) -> Result<CriticalSituation, CoreError> {
        self.critical_situation(account, self.clock.today())
    }

    fn projection(&self) -> ProjectionEngine<'_> {
        ProjectionEngine::new(&self.accounts, &self.cache, &self.series)
    }
}
