//! # Account Registry
//!
//! Accounts are identified by [`AccountId`], belong to exactly one sector
//! and carry a balance. Identity and sector never change. The balance
//! changes only when a transaction is validated `Feasible`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use secflow_core::{AccountId, Amount, Sector, Symbol};

use crate::error::EngineError;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: AccountId,
    /// Sector the account belongs to.
    pub sector: Sector,
    /// Current balance.
    pub balance: Amount,
    /// Symbol currently assigned in the taxonomy (or about to be).
    pub symbol: Symbol,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// What the caller gets back from account creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHandle {
    /// Account identifier.
    pub id: AccountId,
    /// Sector the account belongs to.
    pub sector: Sector,
    /// Symbol issued by the allocator.
    pub symbol: Symbol,
}

/// All registered accounts, ordered by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountRegistry {
    accounts: BTreeMap<AccountId, Account>,
}

impl AccountRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `account`.
    pub fn insert(&mut self, account: Account) -> Result<AccountHandle, EngineError> {
        if self.accounts.contains_key(&account.id) {
            return Err(EngineError::DuplicateAccount(account.id));
        }
        let handle = AccountHandle {
            id: account.id.clone(),
            sector: account.sector,
            symbol: account.symbol,
        };
        self.accounts.insert(account.id.clone(), account);
        Ok(handle)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &AccountId) -> bool {
        self.accounts.contains_key(id)
    }

    /// The account `id`, if registered.
    pub fn get(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    /// The account `id`, or [`EngineError::UnknownAccount`].
    pub fn require(&self, id: &AccountId) -> Result<&Account, EngineError> {
        self.accounts
            .get(id)
            .ok_or_else(|| EngineError::UnknownAccount(id.clone()))
    }

    /// Record that `id` now carries `symbol`.
    pub fn set_symbol(&mut self, id: &AccountId, symbol: Symbol) -> Result<(), EngineError> {
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownAccount(id.clone()))?;
        account.symbol = symbol;
        Ok(())
    }

    /// Debit `source` and credit `target` by `amount`, atomically.
    ///
    /// Both new balances are computed before either is written, so a failed
    /// transfer leaves both accounts untouched.
    pub fn transfer(
        &mut self,
        source: &AccountId,
        target: &AccountId,
        amount: Amount,
    ) -> Result<(), EngineError> {
        let debited = self.require(source)?.balance.checked_sub(amount)?;
        let credited = self.require(target)?.balance.checked_add(amount)?;
        if let Some(account) = self.accounts.get_mut(source) {
            account.balance = debited;
        }
        if let Some(account) = self.accounts.get_mut(target) {
            account.balance = credited;
        }
        Ok(())
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no account is registered.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Accounts in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, sector: Sector, balance: u64, symbol: char) -> Account {
        Account {
            id: AccountId::new(id).unwrap(),
            sector,
            balance: Amount::from_units(balance),
            symbol: Symbol(symbol),
            created_at: Utc::now(),
        }
    }

    fn registry() -> AccountRegistry {
        let mut r = AccountRegistry::new();
        r.insert(account("alice", Sector::Agriculture, 2500, 'A')).unwrap();
        r.insert(account("bob", Sector::Industry, 1800, 'I')).unwrap();
        r
    }

    #[test]
    fn duplicate_rejected() {
        let mut r = registry();
        let err = r.insert(account("alice", Sector::Energy, 1, 'E')).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateAccount(id) if id.as_str() == "alice"));
        assert_eq!(r.len(), 2);
        assert_eq!(r.get(&AccountId::new("alice").unwrap()).unwrap().sector, Sector::Agriculture);
    }

    #[test]
    fn transfer_moves_balance() {
        let mut r = registry();
        let alice = AccountId::new("alice").unwrap();
        let bob = AccountId::new("bob").unwrap();
        r.transfer(&alice, &bob, Amount::from_units(300)).unwrap();
        assert_eq!(r.get(&alice).unwrap().balance, Amount::from_units(2200));
        assert_eq!(r.get(&bob).unwrap().balance, Amount::from_units(2100));
    }

    #[test]
    fn overdraft_leaves_balances_untouched() {
        let mut r = registry();
        let alice = AccountId::new("alice").unwrap();
        let bob = AccountId::new("bob").unwrap();
        assert!(r.transfer(&bob, &alice, Amount::from_units(5000)).is_err());
        assert_eq!(r.get(&alice).unwrap().balance, Amount::from_units(2500));
        assert_eq!(r.get(&bob).unwrap().balance, Amount::from_units(1800));
    }
}
