use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tinybank_core::{AccountId, DomainError, DomainResult, Entity, UserId};
use tinybank_ledger::Account;

/// Canonical account records plus a secondary index by owning user.
///
/// Implementations must be safe under unbounded concurrent callers. Reads may
/// overlap each other; writes are exclusive against all other access.
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Fails with `AlreadyExists` on id collision.
    fn insert(&self, account: Account) -> DomainResult<Account>;

    /// Fetch one account. Fails with `NotFound` if absent.
    fn get(&self, id: &AccountId) -> DomainResult<Account>;

    /// All accounts owned by `user_id`, soft-deleted ones included.
    /// Order is not significant.
    fn get_by_user(&self, user_id: &UserId) -> DomainResult<Vec<Account>>;

    /// Overwrite each listed account by id, inserting missing ones.
    fn update_bulk(&self, accounts: Vec<Account>) -> DomainResult<()>;

    /// Atomic read-modify-write of a single account.
    ///
    /// `change` runs against a copy under the write lock; the copy replaces the
    /// stored row only if `change` succeeds.
    fn update(
        &self,
        id: &AccountId,
        change: &mut dyn FnMut(&mut Account) -> DomainResult<()>,
    ) -> DomainResult<Account>;
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    fn insert(&self, account: Account) -> DomainResult<Account> {
        (**self).insert(account)
    }

    fn get(&self, id: &AccountId) -> DomainResult<Account> {
        (**self).get(id)
    }

    fn get_by_user(&self, user_id: &UserId) -> DomainResult<Vec<Account>> {
        (**self).get_by_user(user_id)
    }

    fn update_bulk(&self, accounts: Vec<Account>) -> DomainResult<()> {
        (**self).update_bulk(accounts)
    }

    fn update(
        &self,
        id: &AccountId,
        change: &mut dyn FnMut(&mut Account) -> DomainResult<()>,
    ) -> DomainResult<Account> {
        (**self).update(id, change)
    }
}

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<AccountId, Account>,
    by_user: HashMap<UserId, Vec<AccountId>>,
}

impl Accounts {
    fn index(&mut self, account: &Account) {
        let ids = self.by_user.entry(account.user_id().clone()).or_default();
        if !ids.contains(account.id()) {
            ids.push(account.id().clone());
        }
    }

    fn unindex(&mut self, account: &Account) {
        if let Some(ids) = self.by_user.get_mut(account.user_id()) {
            ids.retain(|id| id != account.id());
            if ids.is_empty() {
                self.by_user.remove(account.user_id());
            }
        }
    }
}

/// In-memory account store for dev/tests and the default server wiring.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<Accounts>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn poisoned<T>(_: T) -> DomainError {
        DomainError::storage("account store lock poisoned")
    }
}

impl AccountStore for InMemoryAccountStore {
    fn insert(&self, account: Account) -> DomainResult<Account> {
        let mut accounts = self.inner.write().map_err(Self::poisoned)?;
        if accounts.by_id.contains_key(account.id()) {
            return Err(DomainError::already_exists("account", account.id()));
        }
        accounts.index(&account);
        accounts.by_id.insert(account.id().clone(), account.clone());
        Ok(account)
    }

    fn get(&self, id: &AccountId) -> DomainResult<Account> {
        let accounts = self.inner.read().map_err(Self::poisoned)?;
        accounts
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("account", id))
    }

    fn get_by_user(&self, user_id: &UserId) -> DomainResult<Vec<Account>> {
        let accounts = self.inner.read().map_err(Self::poisoned)?;
        Ok(accounts
            .by_user
            .get(user_id)
            .map(|ids| ids.iter().filter_map(|id| accounts.by_id.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    fn update_bulk(&self, updated: Vec<Account>) -> DomainResult<()> {
        let mut accounts = self.inner.write().map_err(Self::poisoned)?;
        for account in updated {
            if let Some(previous) = accounts.by_id.get(account.id()).cloned() {
                if previous.user_id() != account.user_id() {
                    accounts.unindex(&previous);
                }
            }
            accounts.index(&account);
            accounts.by_id.insert(account.id().clone(), account);
        }
        Ok(())
    }

    fn update(
        &self,
        id: &AccountId,
        change: &mut dyn FnMut(&mut Account) -> DomainResult<()>,
    ) -> DomainResult<Account> {
        let mut accounts = self.inner.write().map_err(Self::poisoned)?;
        let stored = accounts
            .by_id
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("account", id))?;

        let mut draft = stored.clone();
        change(&mut draft)?;
        *stored = draft.clone();
        Ok(draft)
    }
}
