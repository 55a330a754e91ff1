//! Account table with the distinguished virtual savings account.

use std::collections::HashMap;

use compta_domain::{Account, AccountId, AccountKind};

use crate::CoreError;

#[derive(Debug, Clone)]
pub struct AccountTable {
    accounts: HashMap<AccountId, Account>,
    order: Vec<AccountId>,
    savings: AccountId,
}

impl AccountTable {
    /// Creates a table holding only a fresh virtual savings account.
    pub fn new(savings_name: impl Into<String>) -> Self {
        let savings = Account::new(savings_name, AccountKind::VirtualSavings);
        let savings_id = savings.id();
        Self {
            accounts: HashMap::from([(savings_id, savings)]),
            order: vec![savings_id],
            savings: savings_id,
        }
    }

    /// Adds an account. A virtual savings account replaces the distinguished
    /// one, which lets a loader restore a persisted savings identifier.
    pub fn insert(&mut self, account: Account) -> Result<AccountId, CoreError> {
        let id = account.id();
        if self.accounts.contains_key(&id) {
            return Err(CoreError::DuplicateAccount(id));
        }
        if account.kind == AccountKind::VirtualSavings {
            let previous = self.savings;
            self.accounts.remove(&previous);
            self.order.retain(|existing| *existing != previous);
            self.savings = id;
        }
        self.accounts.insert(id, account);
        self.order.push(id);
        Ok(id)
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Resolves `id` or fails with a referential error.
    pub fn require(&self, id: AccountId) -> Result<&Account, CoreError> {
        self.accounts.get(&id).ok_or(CoreError::AccountNotFound(id))
    }

    pub fn kind(&self, id: AccountId) -> Result<AccountKind, CoreError> {
        self.require(id).map(|account| account.kind)
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    pub fn savings(&self) -> AccountId {
        self.savings
    }

    /// Accounts in insertion order, savings account first unless replaced.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.order.iter().filter_map(|id| self.accounts.get(id))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
