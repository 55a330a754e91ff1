use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, RwLock,
};

use chrono::NaiveDate;
use compta_config::{ConfigManager, EngineConfig};
use compta_domain::{
    Account, AccountId, EntryDraft, EntryId, LedgerEntry, MonthKey, RecurringTemplate,
};
use compta_engine::{
    Clock, CoreError, CriticalSituation, DailyBalances, Ledger, Pointage, SystemClock,
    TrackerSettings,
};
use rust_decimal::Decimal;
use tracing::debug;

use crate::errors::LedgerError;

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`LedgerManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Facade that owns the ledger behind a single lock and signals changes.
///
/// Every mutation and its balance pass run under the write lock, so readers
/// see either the state before the call or the fully recomputed state after
/// it. Listeners are called once per successful mutation, after the lock is
/// released, and are expected to re-read through the query methods.
pub struct LedgerManager {
    ledger: RwLock<Ledger>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl LedgerManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let ledger = Ledger::new(
            tracker_settings(config),
            clock,
            config.savings_account_name.clone(),
        );
        Self {
            ledger: RwLock::new(ledger),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Builds a manager from the configuration stored by `manager`.
    pub fn from_config(manager: &ConfigManager) -> Result<Self, LedgerError> {
        let config = manager.load()?;
        Ok(Self::new(&config))
    }

    // ---- change notification ----------------------------------------------

    pub fn subscribe<F>(&self, listener: F) -> Result<SubscriptionId, LedgerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .map_err(|_| LedgerError::Poisoned)?
            .push((id, Arc::new(listener)));
        Ok(id)
    }

    /// Removes a listener, returning whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, LedgerError> {
        let mut listeners = self.listeners.lock().map_err(|_| LedgerError::Poisoned)?;
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        Ok(listeners.len() != before)
    }

    fn notify(&self) -> Result<(), LedgerError> {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .map_err(|_| LedgerError::Poisoned)?
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        debug!(listeners = listeners.len(), "ledger changed");
        for listener in listeners {
            listener();
        }
        Ok(())
    }

    fn mutate<R>(
        &self,
        change: impl FnOnce(&mut Ledger) -> Result<R, CoreError>,
    ) -> Result<R, LedgerError> {
        let result = {
            let mut ledger = self.ledger.write().map_err(|_| LedgerError::Poisoned)?;
            change(&mut ledger)?
        };
        self.notify()?;
        Ok(result)
    }

    /// Runs `query` against a consistent view of the ledger.
    pub fn read<R>(&self, query: impl FnOnce(&Ledger) -> R) -> Result<R, LedgerError> {
        let ledger = self.ledger.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(query(&ledger))
    }

    fn query<R>(
        &self,
        query: impl FnOnce(&Ledger) -> Result<R, CoreError>,
    ) -> Result<R, LedgerError> {
        self.read(query)?.map_err(LedgerError::from)
    }

    // ---- bulk load --------------------------------------------------------

    pub fn load_accounts<I>(&self, accounts: I) -> Result<usize, LedgerError>
    where
        I: IntoIterator<Item = Account>,
    {
        self.mutate(|ledger| ledger.load_accounts(accounts))
    }

    pub fn load_entries<I>(&self, entries: I) -> Result<usize, LedgerError>
    where
        I: IntoIterator<Item = LedgerEntry>,
    {
        self.mutate(|ledger| ledger.load_entries(entries))
    }

    /// Builds entries from raw load records, then loads them. A malformed
    /// record rejects the whole batch.
    pub fn load_entry_drafts<I>(&self, drafts: I) -> Result<usize, LedgerError>
    where
        I: IntoIterator<Item = EntryDraft>,
    {
        let entries = drafts
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(CoreError::from)?;
        self.load_entries(entries)
    }

    pub fn load_templates<I>(&self, templates: I) -> Result<usize, LedgerError>
    where
        I: IntoIterator<Item = RecurringTemplate>,
    {
        self.mutate(|ledger| ledger.load_templates(templates))
    }

    // ---- mutation ---------------------------------------------------------

    pub fn insert_entry(&self, entry: LedgerEntry) -> Result<EntryId, LedgerError> {
        self.mutate(|ledger| ledger.insert_entry(entry))
    }

    pub fn update_entry(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.mutate(|ledger| ledger.update_entry(entry))
    }

    pub fn remove_entry(&self, id: EntryId) -> Result<Arc<LedgerEntry>, LedgerError> {
        self.mutate(|ledger| ledger.remove_entry(id))
    }

    pub fn generate_recurring(&self, month: MonthKey) -> Result<Vec<EntryId>, LedgerError> {
        self.mutate(|ledger| ledger.generate_recurring(month))
    }

    // ---- queries ----------------------------------------------------------

    pub fn entry(&self, id: EntryId) -> Result<Option<Arc<LedgerEntry>>, LedgerError> {
        self.read(|ledger| ledger.entry(id))
    }

    pub fn get_all_since(&self, month: MonthKey) -> Result<Vec<Arc<LedgerEntry>>, LedgerError> {
        self.read(|ledger| ledger.cache().all_since(month))
    }

    pub fn get_all_to(&self, month: MonthKey) -> Result<Vec<Arc<LedgerEntry>>, LedgerError> {
        self.read(|ledger| ledger.cache().all_to(month))
    }

    pub fn get_all_between(
        &self,
        from: MonthKey,
        to: MonthKey,
    ) -> Result<Vec<Arc<LedgerEntry>>, LedgerError> {
        self.read(|ledger| ledger.cache().all_between(from, to))
    }

    pub fn get_pointages_since(&self, month: MonthKey) -> Result<Vec<Pointage>, LedgerError> {
        self.read(|ledger| ledger.cache().pointages_since(month))
    }

    pub fn get_pointages_to(&self, month: MonthKey) -> Result<Vec<Pointage>, LedgerError> {
        self.read(|ledger| ledger.cache().pointages_to(month))
    }

    pub fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.read(|ledger| ledger.account(id).cloned())
    }

    pub fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.read(|ledger| ledger.accounts().iter().cloned().collect())
    }

    pub fn savings_account(&self) -> Result<AccountId, LedgerError> {
        self.read(Ledger::savings_account)
    }

    pub fn templates(&self) -> Result<Vec<RecurringTemplate>, LedgerError> {
        self.read(|ledger| ledger.templates().iter().cloned().collect())
    }

    pub fn entries_for_account(
        &self,
        account: AccountId,
        from: MonthKey,
        to: MonthKey,
    ) -> Result<Vec<Arc<LedgerEntry>>, LedgerError> {
        self.query(|ledger| ledger.entries_for_account(account, from, to))
    }

    pub fn historique(
        &self,
        account: AccountId,
        month: MonthKey,
    ) -> Result<Option<Decimal>, LedgerError> {
        self.query(|ledger| ledger.historique(account, month))
    }

    pub fn solde_a_vue(
        &self,
        account: AccountId,
        month: MonthKey,
    ) -> Result<Option<Decimal>, LedgerError> {
        self.query(|ledger| ledger.solde_a_vue(account, month))
    }

    pub fn moyenne(
        &self,
        account: AccountId,
        month: MonthKey,
    ) -> Result<Option<Decimal>, LedgerError> {
        self.query(|ledger| ledger.moyenne(account, month))
    }

    pub fn daily_balances(
        &self,
        account: AccountId,
        month: MonthKey,
        use_cleared: bool,
    ) -> Result<DailyBalances, LedgerError> {
        self.query(|ledger| ledger.daily_balances(account, month, use_cleared))
    }

    pub fn critical_situation(
        &self,
        account: AccountId,
        reference: NaiveDate,
    ) -> Result<CriticalSituation, LedgerError> {
        self.query(|ledger| ledger.critical_situation(account, reference))
    }

    pub fn critical_situation_today(
        &self,
        account: AccountId,
    ) -> Result<CriticalSituation, LedgerError> {
        self.query(|ledger| ledger.critical_situation_today(account))
    }
}

fn tracker_settings(config: &EngineConfig) -> TrackerSettings {
    TrackerSettings {
        average_window: config.average_window,
        average_scale: config.average_scale,
        store_zero_averages: config.store_zero_averages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compta_domain::AccountKind;
    use compta_engine::FixedClock;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;

    fn manager() -> LedgerManager {
        LedgerManager::with_clock(
            &EngineConfig::default(),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())),
        )
    }

    #[test]
    fn savings_account_uses_the_configured_name() {
        let manager = manager();
        let savings = manager.savings_account().unwrap();
        let account = manager.account(savings).unwrap().unwrap();
        assert_eq!(account.name, "Épargne");
        assert_eq!(account.kind, AccountKind::VirtualSavings);
    }

    #[test]
    fn failed_mutations_do_not_notify() {
        let manager = manager();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        manager
            .subscribe(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let err = manager.remove_entry(EntryId(7)).unwrap_err();
        assert!(matches!(
            err.core(),
            Some(CoreError::EntryNotFound(EntryId(7)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let bank = Account::new("Bank", AccountKind::Bank);
        let food = Account::new("Food", AccountKind::Budget);
        let (bank_id, food_id) = (bank.id(), food.id());
        manager.load_accounts([bank, food]).unwrap();
        let entry = LedgerEntry::new(
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            bank_id,
            food_id,
            dec!(12.50),
        )
        .unwrap();
        manager.insert_entry(entry).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
