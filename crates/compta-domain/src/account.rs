use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// Stable account identifier, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which side of a double entry an account sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntrySide {
    Debit,
    Credit,
}

/// Enumerates the supported account classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    /// Bank-like: a credit increases the balance, a debit decreases it.
    Bank,
    /// Budget-like: the convention is inverted, a credit decreases the balance.
    Budget,
    /// The distinguished account aggregating savings-flagged entries.
    VirtualSavings,
}

impl AccountKind {
    /// Signed effect of `amount` booked on `side` of an account of this kind.
    pub fn effect(self, side: EntrySide, amount: Decimal) -> Decimal {
        match (self, side) {
            (AccountKind::Budget, EntrySide::Debit) => amount,
            (AccountKind::Budget, EntrySide::Credit) => -amount,
            (_, EntrySide::Debit) => -amount,
            (_, EntrySide::Credit) => amount,
        }
    }

    /// Whether `historique` carries the previous month forward (running
    /// balance) or restarts from zero every month (monthly total).
    pub fn is_running_balance(self) -> bool {
        !matches!(self, AccountKind::Budget)
    }

    /// Only bank-like accounts have a meaningful cleared balance.
    pub fn tracks_cleared(self) -> bool {
        matches!(self, AccountKind::Bank)
    }

    /// Only budget-like accounts maintain a rolling average.
    pub fn tracks_average(self) -> bool {
        matches!(self, AccountKind::Budget)
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountKind::Bank => "Bank",
            AccountKind::Budget => "Budget",
            AccountKind::VirtualSavings => "Savings",
        };
        f.write_str(label)
    }
}

/// A ledger account. Display attributes are carried along but never consulted
/// by the balance engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    id: AccountId,
    pub name: String,
    pub kind: AccountKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Account {
    /// Creates an account with a freshly generated identifier.
    pub fn new(name: impl Into<String>, kind: AccountKind) -> Self {
        Self::with_id(AccountId::new(), name, kind)
    }

    /// Restores an account whose identifier was assigned earlier.
    pub fn with_id(id: AccountId, name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            notes: None,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }
}

impl Displayable for Account {
    fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.kind)
    }
}
