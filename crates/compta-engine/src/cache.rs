//! Indexed in-memory store of ledger entries.
//!
//! Besides the identifier map the cache keeps two month-bucketed indices: one
//! keyed by entry month holding `(date, id)`-ordered entries, one keyed by
//! clearing month holding `(clearing date, id, side)`-ordered pointages. Query
//! results are vectors of shared immutable entries, so later mutations of the
//! cache never affect a snapshot already handed out.

use std::{
    collections::{BTreeMap, HashMap},
    ops::RangeBounds,
    sync::Arc,
};

use chrono::NaiveDate;
use compta_domain::{EntryId, EntrySide, LedgerEntry, MonthKey, TemplateId};
use tracing::debug;

use crate::CoreError;

type DateKey = (NaiveDate, EntryId);
type ClearingKey = (NaiveDate, EntryId, EntrySide);

/// One cleared side of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointage {
    pub date: NaiveDate,
    pub side: EntrySide,
    pub entry: Arc<LedgerEntry>,
}

#[derive(Debug, Clone)]
pub struct LedgerCache {
    entries: HashMap<EntryId, Arc<LedgerEntry>>,
    by_month: BTreeMap<MonthKey, BTreeMap<DateKey, Arc<LedgerEntry>>>,
    by_clearing: BTreeMap<MonthKey, BTreeMap<ClearingKey, Arc<LedgerEntry>>>,
    /// `None` once `u64::MAX` has been handed out.
    next_id: Option<u64>,
}

impl Default for LedgerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            by_month: BTreeMap::new(),
            by_clearing: BTreeMap::new(),
            next_id: Some(1),
        }
    }

    /// Stores `entry`, assigning the next identifier when it carries none.
    pub fn insert(&mut self, entry: LedgerEntry) -> Result<Arc<LedgerEntry>, CoreError> {
        let entry = match entry.id() {
            Some(id) if self.entries.contains_key(&id) => {
                return Err(CoreError::DuplicateEntry(id));
            }
            Some(id) => {
                self.advance_past(id);
                entry
            }
            None => {
                let id = self.next_id.map(EntryId).ok_or(CoreError::IdsExhausted)?;
                if self.entries.contains_key(&id) {
                    return Err(CoreError::DuplicateEntry(id));
                }
                self.advance_past(id);
                entry.with_id(id)
            }
        };
        let stored = Arc::new(entry);
        self.index(&stored)?;
        debug!(entry = ?stored.id(), month = %stored.month(), "cached entry");
        Ok(stored)
    }

    /// Replaces the entry stored under `entry`'s identifier, returning the
    /// previous value and the new one.
    pub fn update(
        &mut self,
        entry: LedgerEntry,
    ) -> Result<(Arc<LedgerEntry>, Arc<LedgerEntry>), CoreError> {
        let id = entry.id().ok_or(CoreError::MissingId)?;
        let old = self.remove(id)?;
        let new = self.insert(entry)?;
        Ok((old, new))
    }

    pub fn remove(&mut self, id: EntryId) -> Result<Arc<LedgerEntry>, CoreError> {
        let entry = self
            .entries
            .remove(&id)
            .ok_or(CoreError::EntryNotFound(id))?;
        let month = entry.month();
        if let Some(bucket) = self.by_month.get_mut(&month) {
            bucket.remove(&(entry.date(), id));
            if bucket.is_empty() {
                self.by_month.remove(&month);
            }
        }
        for side in [EntrySide::Debit, EntrySide::Credit] {
            let Some(cleared) = entry.clearing_date(side) else {
                continue;
            };
            let month = MonthKey::from_date(cleared);
            if let Some(bucket) = self.by_clearing.get_mut(&month) {
                bucket.remove(&(cleared, id, side));
                if bucket.is_empty() {
                    self.by_clearing.remove(&month);
                }
            }
        }
        debug!(entry = %id, "removed entry");
        Ok(entry)
    }

    /// Rolls back to `snapshot`. Identifiers handed out since the snapshot
    /// stay consumed.
    pub fn roll_back(&mut self, snapshot: LedgerCache) {
        let next_id = match (self.next_id, snapshot.next_id) {
            (Some(current), Some(earlier)) => Some(current.max(earlier)),
            _ => None,
        };
        *self = snapshot;
        self.next_id = next_id;
    }

    fn advance_past(&mut self, id: EntryId) {
        self.next_id = match (self.next_id, id.0.checked_add(1)) {
            (Some(next), Some(after)) => Some(next.max(after)),
            _ => None,
        };
    }

    pub fn get(&self, id: EntryId) -> Option<Arc<LedgerEntry>> {
        self.entries.get(&id).cloned()
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose month is `month` or later, in `(date, id)` order.
    pub fn all_since(&self, month: MonthKey) -> Vec<Arc<LedgerEntry>> {
        self.collect_entries(month..)
    }

    /// Entries whose month is `month` or earlier, in `(date, id)` order.
    pub fn all_to(&self, month: MonthKey) -> Vec<Arc<LedgerEntry>> {
        self.collect_entries(..=month)
    }

    /// Entries with months in `from..=to`, in `(date, id)` order.
    pub fn all_between(&self, from: MonthKey, to: MonthKey) -> Vec<Arc<LedgerEntry>> {
        if to < from {
            return Vec::new();
        }
        self.collect_entries(from..=to)
    }

    pub fn entries_in(&self, month: MonthKey) -> Vec<Arc<LedgerEntry>> {
        self.collect_entries(month..=month)
    }

    /// Cleared sides whose clearing month is `month` or later, in clearing
    /// date order.
    pub fn pointages_since(&self, month: MonthKey) -> Vec<Pointage> {
        self.collect_pointages(month..)
    }

    pub fn pointages_to(&self, month: MonthKey) -> Vec<Pointage> {
        self.collect_pointages(..=month)
    }

    pub fn pointages_between(&self, from: MonthKey, to: MonthKey) -> Vec<Pointage> {
        if to < from {
            return Vec::new();
        }
        self.collect_pointages(from..=to)
    }

    /// Entries generated by `template` during `month`.
    pub fn generated_in(&self, month: MonthKey, template: TemplateId) -> Vec<Arc<LedgerEntry>> {
        self.entries_in(month)
            .into_iter()
            .filter(|entry| entry.template() == Some(template))
            .collect()
    }

    /// Earliest entry month held by the cache.
    pub fn first_month(&self) -> Option<MonthKey> {
        self.by_month.keys().next().copied()
    }

    fn index(&mut self, entry: &Arc<LedgerEntry>) -> Result<(), CoreError> {
        let id = entry.id().ok_or(CoreError::MissingId)?;
        self.entries.insert(id, Arc::clone(entry));
        self.by_month
            .entry(entry.month())
            .or_default()
            .insert((entry.date(), id), Arc::clone(entry));
        for side in [EntrySide::Debit, EntrySide::Credit] {
            if let Some(cleared) = entry.clearing_date(side) {
                self.by_clearing
                    .entry(MonthKey::from_date(cleared))
                    .or_default()
                    .insert((cleared, id, side), Arc::clone(entry));
            }
        }
        Ok(())
    }

    fn collect_entries<R>(&self, months: R) -> Vec<Arc<LedgerEntry>>
    where
        R: RangeBounds<MonthKey>,
    {
        self.by_month
            .range(months)
            .flat_map(|(_, bucket)| bucket.values().cloned())
            .collect()
    }

    fn collect_pointages<R>(&self, months: R) -> Vec<Pointage>
    where
        R: RangeBounds<MonthKey>,
    {
        self.by_clearing
            .range(months)
            .flat_map(|(_, bucket)| {
                bucket.iter().map(|((date, _, side), entry)| Pointage {
                    date: *date,
                    side: *side,
                    entry: Arc::clone(entry),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compta_domain::AccountId;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn entry(on: NaiveDate) -> LedgerEntry {
        LedgerEntry::new(on, AccountId::new(), AccountId::new(), dec!(10)).unwrap()
    }

    fn ids(entries: &[Arc<LedgerEntry>]) -> Vec<u64> {
        entries.iter().filter_map(|e| e.id()).map(|id| id.0).collect()
    }

    #[test]
    fn assigns_monotonic_ids_never_reused() {
        let mut cache = LedgerCache::new();
        let first = cache.insert(entry(date(2024, 1, 1))).unwrap();
        let second = cache.insert(entry(date(2024, 1, 2))).unwrap();
        cache.remove(second.id().unwrap()).unwrap();
        let third = cache.insert(entry(date(2024, 1, 3))).unwrap();
        assert_eq!(first.id(), Some(EntryId(1)));
        assert_eq!(second.id(), Some(EntryId(2)));
        assert_eq!(third.id(), Some(EntryId(3)));
    }

    #[test]
    fn explicit_ids_advance_the_generator() {
        let mut cache = LedgerCache::new();
        cache.insert(entry(date(2024, 1, 1)).with_id(EntryId(40))).unwrap();
        let next = cache.insert(entry(date(2024, 1, 1))).unwrap();
        assert_eq!(next.id(), Some(EntryId(41)));
    }

    #[test]
    fn generator_stops_after_the_largest_id() {
        let mut cache = LedgerCache::new();
        cache
            .insert(entry(date(2024, 1, 1)).with_id(EntryId(u64::MAX)))
            .unwrap();
        let lower = cache.insert(entry(date(2024, 1, 2)).with_id(EntryId(7))).unwrap();
        assert_eq!(lower.id(), Some(EntryId(7)));

        let err = cache.insert(entry(date(2024, 1, 3))).unwrap_err();
        assert_eq!(err, CoreError::IdsExhausted);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(EntryId(u64::MAX)).unwrap().date(), date(2024, 1, 1));

        let snapshot = LedgerCache::new();
        cache.roll_back(snapshot);
        assert!(cache.is_empty());
        assert_eq!(
            cache.insert(entry(date(2024, 1, 4))).unwrap_err(),
            CoreError::IdsExhausted
        );
    }

    #[test]
    fn rejects_duplicate_explicit_ids() {
        let mut cache = LedgerCache::new();
        cache.insert(entry(date(2024, 1, 1)).with_id(EntryId(5))).unwrap();
        let err = cache
            .insert(entry(date(2024, 2, 1)).with_id(EntryId(5)))
            .unwrap_err();
        assert_eq!(err, CoreError::DuplicateEntry(EntryId(5)));
        assert_eq!(cache.len(), 1);
        assert!(cache.entries_in(month(2024, 2)).is_empty());
    }

    #[test]
    fn orders_by_date_then_id_across_months() {
        let mut cache = LedgerCache::new();
        cache.insert(entry(date(2024, 3, 5))).unwrap(); // 1
        cache.insert(entry(date(2024, 1, 20))).unwrap(); // 2
        cache.insert(entry(date(2024, 3, 5))).unwrap(); // 3
        cache.insert(entry(date(2024, 2, 1))).unwrap(); // 4
        cache.insert(entry(date(2024, 3, 1))).unwrap(); // 5

        assert_eq!(ids(&cache.all_since(month(2024, 2))), vec![4, 5, 1, 3]);
        assert_eq!(ids(&cache.all_to(month(2024, 2))), vec![2, 4]);
        assert_eq!(ids(&cache.all_between(month(2024, 1), month(2024, 2))), vec![2, 4]);
        assert!(cache.all_between(month(2024, 3), month(2024, 1)).is_empty());
    }

    #[test]
    fn indexes_clearing_dates_per_side() {
        let mut cache = LedgerCache::new();
        let cleared = entry(date(2024, 1, 30))
            .cleared(EntrySide::Debit, Some(date(2024, 2, 2)))
            .cleared(EntrySide::Credit, Some(date(2024, 1, 31)));
        cache.insert(cleared).unwrap();
        cache.insert(entry(date(2024, 2, 1))).unwrap();

        let since_feb = cache.pointages_since(month(2024, 2));
        assert_eq!(since_feb.len(), 1);
        assert_eq!(since_feb[0].side, EntrySide::Debit);
        assert_eq!(since_feb[0].date, date(2024, 2, 2));

        let to_jan = cache.pointages_to(month(2024, 1));
        assert_eq!(to_jan.len(), 1);
        assert_eq!(to_jan[0].side, EntrySide::Credit);
    }

    #[test]
    fn remove_and_update_keep_indices_consistent() {
        let mut cache = LedgerCache::new();
        let stored = cache
            .insert(entry(date(2024, 1, 10)).cleared(EntrySide::Debit, Some(date(2024, 1, 12))))
            .unwrap();
        let id = stored.id().unwrap();

        let moved = LedgerEntry::new(date(2024, 4, 2), stored.debit(), stored.credit(), dec!(15))
            .unwrap()
            .with_id(id);
        let (old, new) = cache.update(moved).unwrap();
        assert_eq!(old.date(), date(2024, 1, 10));
        assert_eq!(new.id(), Some(id));
        assert!(cache.entries_in(month(2024, 1)).is_empty());
        assert!(cache.pointages_since(month(2024, 1)).is_empty());
        assert_eq!(ids(&cache.entries_in(month(2024, 4))), vec![id.0]);

        cache.remove(id).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.first_month(), None);
        assert_eq!(cache.remove(id).unwrap_err(), CoreError::EntryNotFound(id));
    }

    #[test]
    fn update_requires_known_identifier() {
        let mut cache = LedgerCache::new();
        assert_eq!(
            cache.update(entry(date(2024, 1, 1))).unwrap_err(),
            CoreError::MissingId
        );
        assert_eq!(
            cache
                .update(entry(date(2024, 1, 1)).with_id(EntryId(9)))
                .unwrap_err(),
            CoreError::EntryNotFound(EntryId(9))
        );
    }

    #[test]
    fn snapshots_survive_later_mutation() {
        let mut cache = LedgerCache::new();
        let stored = cache.insert(entry(date(2024, 5, 1))).unwrap();
        let snapshot = cache.all_since(month(2024, 1));
        cache.remove(stored.id().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].date(), date(2024, 5, 1));
    }
}
