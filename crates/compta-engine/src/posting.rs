//! Signed per-account effects of a ledger entry.

use compta_domain::{AccountId, AccountKind, EntrySide, LedgerEntry};
use rust_decimal::Decimal;

use crate::{AccountTable, CoreError};

/// The signed amount an entry books on one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub account: AccountId,
    pub kind: AccountKind,
    pub amount: Decimal,
}

/// Effects of `entry` on its debit and credit accounts, plus the mirrored
/// effect on the virtual savings account for savings-flagged entries. Money
/// leaving the debit side lands in savings, so the mirror is the opposite of
/// the debit effect.
pub fn postings(entry: &LedgerEntry, accounts: &AccountTable) -> Result<Vec<Posting>, CoreError> {
    let mut postings = Vec::with_capacity(3);
    for (side, account) in entry.sides() {
        let kind = accounts.kind(account)?;
        postings.push(Posting {
            account,
            kind,
            amount: kind.effect(side, entry.amount()),
        });
    }
    if entry.is_savings() {
        let savings = accounts.savings();
        let debit_effect = postings
            .first()
            .map(|posting| posting.amount)
            .unwrap_or(Decimal::ZERO);
        postings.push(Posting {
            account: savings,
            kind: accounts.kind(savings)?,
            amount: -debit_effect,
        });
    }
    Ok(postings)
}

/// Effect of the cleared `side` of `entry` on that side's account.
pub fn cleared_posting(
    entry: &LedgerEntry,
    side: EntrySide,
    accounts: &AccountTable,
) -> Result<Posting, CoreError> {
    let account = entry.account(side);
    let kind = accounts.kind(account)?;
    Ok(Posting {
        account,
        kind,
        amount: kind.effect(side, entry.amount()),
    })
}

/// Net effect of `entry` on `account`, zero when the account is not involved.
pub fn net_effect(
    entry: &LedgerEntry,
    account: AccountId,
    accounts: &AccountTable,
) -> Result<Decimal, CoreError> {
    Ok(postings(entry, accounts)?
        .into_iter()
        .filter(|posting| posting.account == account)
        .map(|posting| posting.amount)
        .sum())
}
