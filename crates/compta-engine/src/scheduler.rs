//! Dependency-ordered generation of recurring entries.
//!
//! Templates are generated in topological order of their proportional
//! dependencies, ties following load order. Payoff templates are held back
//! until every other ready template has run, so the balance they clear
//! includes the month's other recurring entries. A missing dependency or a
//! cycle fails the plan before anything is generated.

use std::collections::{HashMap, VecDeque};

use compta_domain::{
    round_half_up, AmountPolicy, EntrySide, LedgerEntry, MonthKey, RecurringTemplate, TemplateId,
};
use rust_decimal::Decimal;
use tracing::warn;

use crate::{AccountTable, CoreError, SeriesBook, SeriesKind};

const PROPORTIONAL_SCALE: u32 = 2;

/// Recurring templates in load order.
#[derive(Debug, Clone, Default)]
pub struct TemplateTable {
    templates: HashMap<TemplateId, RecurringTemplate>,
    order: Vec<TemplateId>,
}

impl TemplateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: RecurringTemplate) -> Result<TemplateId, CoreError> {
        let id = template.id();
        if self.templates.contains_key(&id) {
            return Err(CoreError::DuplicateTemplate(id));
        }
        self.order.push(id);
        self.templates.insert(id, template);
        Ok(id)
    }

    pub fn get(&self, id: TemplateId) -> Option<&RecurringTemplate> {
        self.templates.get(&id)
    }

    pub fn contains(&self, id: TemplateId) -> bool {
        self.templates.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecurringTemplate> {
        self.order.iter().filter_map(|id| self.templates.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Orders every template so each proportional one comes after the
    /// template it depends on, and payoffs come after everything that does
    /// not wait on a payoff.
    pub fn plan(&self, month: MonthKey) -> Result<GenerationPlan, CoreError> {
        let mut dependents: HashMap<TemplateId, Vec<TemplateId>> = HashMap::new();
        let mut ready = VecDeque::new();
        let mut payoffs = VecDeque::new();
        for template in self.iter() {
            match template.dependency() {
                Some(dependency) if !self.contains(dependency) => {
                    warn!(template = %template.id(), %dependency, "unknown template dependency");
                    return Err(CoreError::MissingDependency {
                        template: template.id(),
                        dependency,
                    });
                }
                Some(dependency) => dependents.entry(dependency).or_default().push(template.id()),
                None if template.policy().is_payoff() => payoffs.push_back(template.id()),
                None => ready.push_back(template.id()),
            }
        }

        let mut order = Vec::with_capacity(self.len());
        while let Some(id) = ready.pop_front().or_else(|| payoffs.pop_front()) {
            order.push(id);
            if let Some(children) = dependents.remove(&id) {
                ready.extend(children);
            }
        }

        if order.len() < self.len() {
            let stuck: Vec<TemplateId> = self
                .order
                .iter()
                .filter(|id| !order.contains(id))
                .copied()
                .collect();
            warn!(templates = ?stuck, "recurring template dependency cycle");
            return Err(CoreError::DependencyCycle(stuck));
        }

        Ok(GenerationPlan {
            month,
            order,
            resolved: HashMap::new(),
        })
    }
}

/// Generation order for one month, plus the amounts resolved so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    month: MonthKey,
    order: Vec<TemplateId>,
    resolved: HashMap<TemplateId, Decimal>,
}

impl GenerationPlan {
    pub fn month(&self) -> MonthKey {
        self.month
    }

    pub fn order(&self) -> &[TemplateId] {
        &self.order
    }

    /// Amount already resolved for `template` during this run.
    pub fn resolved(&self, template: TemplateId) -> Option<Decimal> {
        self.resolved.get(&template).copied()
    }

    /// Signed amount `template` generates this month. A template that is not
    /// scheduled this month resolves to zero. Payoff reads the debit
    /// account's `historique` as it stands when called.
    pub fn resolve(
        &mut self,
        template: &RecurringTemplate,
        accounts: &AccountTable,
        series: &SeriesBook,
    ) -> Result<Decimal, CoreError> {
        let amount = if template.date_in(self.month).is_none() {
            Decimal::ZERO
        } else {
            match template.policy() {
                AmountPolicy::Fixed { .. } => template
                    .fixed_amount(self.month)
                    .unwrap_or(Decimal::ZERO),
                AmountPolicy::Proportional { depends_on, rate } => {
                    let base = self.resolved(*depends_on).ok_or(CoreError::MissingDependency {
                        template: template.id(),
                        dependency: *depends_on,
                    })?;
                    round_half_up(base * *rate / Decimal::ONE_HUNDRED, PROPORTIONAL_SCALE)
                }
                AmountPolicy::Payoff => {
                    let kind = accounts.kind(template.debit())?;
                    let balance = series
                        .value(template.debit(), SeriesKind::Historique, self.month)
                        .unwrap_or(Decimal::ZERO);
                    -balance * kind.effect(EntrySide::Debit, Decimal::ONE)
                }
            }
        };
        self.resolved.insert(template.id(), amount);
        Ok(amount)
    }
}

/// Entry generated by `template` for `month` with a signed `amount`. A zero
/// amount or an unscheduled month generates nothing; a negative amount swaps
/// the two sides.
pub fn generated_entry(
    template: &RecurringTemplate,
    month: MonthKey,
    amount: Decimal,
) -> Result<Option<LedgerEntry>, CoreError> {
    let Some(date) = template.date_in(month) else {
        return Ok(None);
    };
    if amount.is_zero() {
        return Ok(None);
    }
    let (debit, credit) = if amount.is_sign_negative() {
        (template.credit(), template.debit())
    } else {
        (template.debit(), template.credit())
    };
    let entry = LedgerEntry::new(date, debit, credit, amount.abs())?
        .with_label(template.label())
        .with_savings(template.is_savings())
        .generated_by(template.id());
    Ok(Some(entry))
}
