//! Recurring ("permanent") operation templates.

use std::{collections::BTreeMap, fmt};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{account::AccountId, month::MonthKey, DomainError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub Uuid);

impl TemplateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How a template computes the amount it generates for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountPolicy {
    /// A fixed amount per calendar month (1..=12).
    Fixed { amounts: BTreeMap<u32, Decimal> },
    /// `rate` percent of the amount another template generates the same month.
    Proportional { depends_on: TemplateId, rate: Decimal },
    /// Transfers the whole current balance of the debit account.
    Payoff,
}

impl AmountPolicy {
    pub fn is_payoff(&self) -> bool {
        matches!(self, AmountPolicy::Payoff)
    }
}

/// A template that generates one ledger entry per scheduled month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TemplateRecord", into = "TemplateRecord")]
pub struct RecurringTemplate {
    id: TemplateId,
    label: String,
    debit: AccountId,
    credit: AccountId,
    schedule: BTreeMap<u32, u32>,
    policy: AmountPolicy,
    savings: bool,
}

impl RecurringTemplate {
    pub fn new(
        label: impl Into<String>,
        debit: AccountId,
        credit: AccountId,
        policy: AmountPolicy,
    ) -> Result<Self, DomainError> {
        if debit == credit {
            return Err(DomainError::SameAccount(debit));
        }
        if let AmountPolicy::Fixed { amounts } = &policy {
            if let Some(month) = amounts.keys().find(|month| !(1..=12).contains(*month)) {
                return Err(DomainError::InvalidMonth(*month));
            }
        }
        Ok(Self {
            id: TemplateId::new(),
            label: label.into(),
            debit,
            credit,
            schedule: BTreeMap::new(),
            policy,
            savings: false,
        })
    }

    pub fn with_id(mut self, id: TemplateId) -> Self {
        self.id = id;
        self
    }

    pub fn with_savings(mut self, savings: bool) -> Self {
        self.savings = savings;
        self
    }

    /// Schedules the template on `day` of every `month` (1..=12). Days past the
    /// end of a short month are clamped to its last day at generation time.
    pub fn scheduled_on(mut self, month: u32, day: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::InvalidMonth(month));
        }
        if !(1..=31).contains(&day) {
            return Err(DomainError::InvalidDay { month, day });
        }
        self.schedule.insert(month, day);
        Ok(self)
    }

    /// Schedules the template on the same day of every month.
    pub fn monthly_on(self, day: u32) -> Result<Self, DomainError> {
        (1..=12).try_fold(self, |template, month| template.scheduled_on(month, day))
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn debit(&self) -> AccountId {
        self.debit
    }

    pub fn credit(&self) -> AccountId {
        self.credit
    }

    pub fn policy(&self) -> &AmountPolicy {
        &self.policy
    }

    pub fn is_savings(&self) -> bool {
        self.savings
    }

    /// The template this one takes its amount from, if proportional.
    pub fn dependency(&self) -> Option<TemplateId> {
        match self.policy {
            AmountPolicy::Proportional { depends_on, .. } => Some(depends_on),
            _ => None,
        }
    }

    /// Generation date inside `month`, `None` when the template is not
    /// scheduled that month.
    pub fn date_in(&self, month: MonthKey) -> Option<NaiveDate> {
        self.schedule
            .get(&month.month())
            .map(|day| month.clamp_day(*day))
    }

    /// Configured amount for `month` under the fixed policy.
    pub fn fixed_amount(&self, month: MonthKey) -> Option<Decimal> {
        match &self.policy {
            AmountPolicy::Fixed { amounts } => amounts.get(&month.month()).copied(),
            _ => None,
        }
    }
}

/// Serialized shape of [`RecurringTemplate`]; deserialization re-runs the
/// constructor checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: TemplateId,
    #[serde(default)]
    pub label: String,
    pub debit: AccountId,
    pub credit: AccountId,
    #[serde(default)]
    pub schedule: BTreeMap<u32, u32>,
    pub policy: AmountPolicy,
    #[serde(default)]
    pub savings: bool,
}

impl TryFrom<TemplateRecord> for RecurringTemplate {
    type Error = DomainError;

    fn try_from(record: TemplateRecord) -> Result<Self, Self::Error> {
        let template = RecurringTemplate::new(record.label, record.debit, record.credit, record.policy)?
            .with_id(record.id)
            .with_savings(record.savings);
        record
            .schedule
            .into_iter()
            .try_fold(template, |template, (month, day)| template.scheduled_on(month, day))
    }
}

impl From<RecurringTemplate> for TemplateRecord {
    fn from(template: RecurringTemplate) -> Self {
        Self {
            id: template.id,
            label: template.label,
            debit: template.debit,
            credit: template.credit,
            schedule: template.schedule,
            policy: template.policy,
            savings: template.savings,
        }
    }
}
