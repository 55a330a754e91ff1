//! Immutable double-entry transactions and their raw load-time form.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    account::{AccountId, EntrySide},
    common::*,
    month::MonthKey,
    template::TemplateId,
    DomainError,
};

/// Ledger entry identifier. Assigned monotonically by the cache and never
/// reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A double-entry transaction between two accounts.
///
/// Entries are immutable once built: "editing" one means building a new value
/// and handing it to the cache under the same identifier. The builder-style
/// `with_*` methods consume the value and cannot break the invariants checked
/// by [`LedgerEntry::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EntryDraft")]
pub struct LedgerEntry {
    id: Option<EntryId>,
    date: NaiveDate,
    debit: AccountId,
    credit: AccountId,
    amount: Decimal,
    debit_cleared: Option<NaiveDate>,
    credit_cleared: Option<NaiveDate>,
    label: String,
    check_number: Option<String>,
    savings: bool,
    template: Option<TemplateId>,
}

impl LedgerEntry {
    /// Builds an entry without identifier; the cache assigns one on insert.
    pub fn new(
        date: NaiveDate,
        debit: AccountId,
        credit: AccountId,
        amount: Decimal,
    ) -> Result<Self, DomainError> {
        if debit == credit {
            return Err(DomainError::SameAccount(debit));
        }
        if amount <= Decimal::ZERO {
            return Err(DomainError::NonPositiveAmount(amount));
        }
        Ok(Self {
            id: None,
            date,
            debit,
            credit,
            amount,
            debit_cleared: None,
            credit_cleared: None,
            label: String::new(),
            check_number: None,
            savings: false,
            template: None,
        })
    }

    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_check_number(mut self, number: impl Into<String>) -> Self {
        self.check_number = Some(number.into());
        self
    }

    /// Records (or clears, with `None`) the clearing date of one side.
    pub fn cleared(mut self, side: EntrySide, date: Option<NaiveDate>) -> Self {
        match side {
            EntrySide::Debit => self.debit_cleared = date,
            EntrySide::Credit => self.credit_cleared = date,
        }
        self
    }

    pub fn with_savings(mut self, savings: bool) -> Self {
        self.savings = savings;
        self
    }

    pub fn generated_by(mut self, template: TemplateId) -> Self {
        self.template = Some(template);
        self
    }

    pub fn id(&self) -> Option<EntryId> {
        self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::from_date(self.date)
    }

    pub fn debit(&self) -> AccountId {
        self.debit
    }

    pub fn credit(&self) -> AccountId {
        self.credit
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn check_number(&self) -> Option<&str> {
        self.check_number.as_deref()
    }

    pub fn is_savings(&self) -> bool {
        self.savings
    }

    pub fn template(&self) -> Option<TemplateId> {
        self.template
    }

    pub fn account(&self, side: EntrySide) -> AccountId {
        match side {
            EntrySide::Debit => self.debit,
            EntrySide::Credit => self.credit,
        }
    }

    pub fn clearing_date(&self, side: EntrySide) -> Option<NaiveDate> {
        match side {
            EntrySide::Debit => self.debit_cleared,
            EntrySide::Credit => self.credit_cleared,
        }
    }

    /// The side `account` sits on, if it takes part in this entry.
    pub fn side_of(&self, account: AccountId) -> Option<EntrySide> {
        if self.debit == account {
            Some(EntrySide::Debit)
        } else if self.credit == account {
            Some(EntrySide::Credit)
        } else {
            None
        }
    }

    /// Both sides with their accounts, debit first.
    pub fn sides(&self) -> [(EntrySide, AccountId); 2] {
        [
            (EntrySide::Debit, self.debit),
            (EntrySide::Credit, self.credit),
        ]
    }

    /// Earliest month whose series this entry contributes to, counting both
    /// clearing dates.
    pub fn earliest_month(&self) -> MonthKey {
        [self.debit_cleared, self.credit_cleared]
            .into_iter()
            .flatten()
            .map(MonthKey::from_date)
            .fold(self.month(), MonthKey::min)
    }
}

impl Displayable for LedgerEntry {
    fn display_label(&self) -> String {
        let id = self
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "#new".into());
        format!("{} {} {} [{}]", id, self.date, self.amount, self.label)
    }
}

/// Raw entry record as streamed by a loader. Every field is optional so that
/// missing data is reported as a construction error instead of a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryDraft {
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub debit: Option<AccountId>,
    #[serde(default)]
    pub credit: Option<AccountId>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub debit_cleared: Option<NaiveDate>,
    #[serde(default)]
    pub credit_cleared: Option<NaiveDate>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub check_number: Option<String>,
    #[serde(default)]
    pub savings: bool,
    #[serde(default)]
    pub template: Option<TemplateId>,
}

impl TryFrom<EntryDraft> for LedgerEntry {
    type Error = DomainError;

    fn try_from(draft: EntryDraft) -> Result<Self, Self::Error> {
        let date = draft.date.ok_or(DomainError::MissingField("date"))?;
        let debit = draft.debit.ok_or(DomainError::MissingField("debit"))?;
        let credit = draft.credit.ok_or(DomainError::MissingField("credit"))?;
        let amount = draft.amount.ok_or(DomainError::MissingField("amount"))?;
        let mut entry = LedgerEntry::new(date, debit, credit, amount)?
            .cleared(EntrySide::Debit, draft.debit_cleared)
            .cleared(EntrySide::Credit, draft.credit_cleared)
            .with_savings(draft.savings);
        entry.id = draft.id;
        entry.label = draft.label.unwrap_or_default();
        entry.check_number = draft.check_number;
        entry.template = draft.template;
        Ok(entry)
    }
}

impl From<&LedgerEntry> for EntryDraft {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id,
            date: Some(entry.date),
            debit: Some(entry.debit),
            credit: Some(entry.credit),
            amount: Some(entry.amount),
            debit_cleared: entry.debit_cleared,
            credit_cleared: entry.credit_cleared,
            label: Some(entry.label.clone()),
            check_number: entry.check_number.clone(),
            savings: entry.savings,
            template: entry.template,
        }
    }
}
