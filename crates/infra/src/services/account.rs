use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use tinybank_core::{AccountId, DomainError, Entity, ErrorKind, UserId};
use tinybank_ledger::Account;

use crate::locks::AccountLockRegistry;
use crate::store::AccountStore;

use super::error::{FailureKind, ServiceError, ServiceResult};
use super::transaction::BalanceLedger;

/// Outcome of soft-deleting every account a user owns.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeletionSummary {
    /// Accounts stamped by this call.
    pub deleted: usize,
    /// Accounts that already carried a deletion stamp.
    pub already_deleted: usize,
    pub failed: Vec<(AccountId, DomainError)>,
}

impl DeletionSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Account lifecycle and the balance-mutation protocol.
///
/// Every balance change goes through [`AccountStore::update`], so a single
/// call is atomic against other mutations of the same row. Sequences of calls
/// are not; [`super::TransactionService`] adds per-account locking on top,
/// and deletion takes the same slots so it cannot land mid-transfer.
#[derive(Debug, Clone)]
pub struct AccountService<S> {
    store: S,
    locks: Arc<AccountLockRegistry>,
}

impl<S: AccountStore> AccountService<S> {
    /// `locks` must be the registry the [`super::TransactionService`] uses.
    pub fn new(store: S, locks: Arc<AccountLockRegistry>) -> Self {
        Self { store, locks }
    }

    pub fn create(&self, user_id: &UserId) -> ServiceResult<Account> {
        let account = Account::create(user_id.clone())
            .map_err(|e| ServiceError::caused_by(FailureKind::AccountCreationFailed, e))?;
        let account = self
            .store
            .insert(account)
            .map_err(|e| ServiceError::caused_by(FailureKind::AccountCreationFailed, e))?;

        debug!(account_id = %account.id(), user_id = %user_id, "account created");
        Ok(account)
    }

    pub fn add_balance(&self, account_id: &AccountId, delta: i64) -> ServiceResult<Account> {
        require_account_id(account_id)?;

        let updated = self
            .store
            .update(account_id, &mut |account| account.add_balance(delta).map(|_| ()))
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ServiceError::caused_by(FailureKind::AccountNotFound, e),
                _ => ServiceError::caused_by(FailureKind::BalanceUpdateFailed, e),
            })?;

        debug!(account_id = %account_id, delta, balance = updated.balance(), "balance updated");
        Ok(updated)
    }

    pub fn get(&self, account_id: &AccountId) -> ServiceResult<Account> {
        require_account_id(account_id)?;
        self.store.get(account_id).map_err(read_failure)
    }

    pub fn get_user_accounts(&self, user_id: &UserId) -> ServiceResult<Vec<Account>> {
        require_user_id(user_id)?;
        self.store.get_by_user(user_id).map_err(read_failure)
    }

    /// Soft-delete every account owned by `user_id`.
    ///
    /// Only a failure to list the accounts is an error; per-account failures
    /// are collected in the summary and do not stop the remaining accounts.
    /// Each account is stamped under its slot, so an in-flight transaction
    /// finishes, reversals included, before the account closes.
    pub fn delete_user_accounts(&self, user_id: &UserId) -> ServiceResult<DeletionSummary> {
        require_user_id(user_id)?;

        let accounts = self
            .store
            .get_by_user(user_id)
            .map_err(|e| ServiceError::caused_by(FailureKind::AccountDeletionFailed, e))?;

        let now = Utc::now();
        let mut summary = DeletionSummary::default();
        for account in accounts {
            let mut stamped = false;
            let outcome = self.locks.with_locked(&[account.id()], || {
                self.store.update(account.id(), &mut |row| {
                    stamped = row.mark_deleted(now);
                    Ok(())
                })
            });

            match outcome {
                Ok(_) if stamped => summary.deleted += 1,
                Ok(_) => summary.already_deleted += 1,
                Err(e) => {
                    warn!(account_id = %account.id(), error = %e, "failed to delete account");
                    summary.failed.push((account.id().clone(), e));
                }
            }
        }

        debug!(
            user_id = %user_id,
            deleted = summary.deleted,
            already_deleted = summary.already_deleted,
            failed = summary.failed.len(),
            "user accounts deleted"
        );
        Ok(summary)
    }
}

impl<S: AccountStore> BalanceLedger for AccountService<S> {
    fn add_balance(&self, account_id: &AccountId, delta: i64) -> ServiceResult<Account> {
        AccountService::add_balance(self, account_id, delta)
    }
}

fn read_failure(e: DomainError) -> ServiceError {
    match e.kind() {
        ErrorKind::NotFound => ServiceError::caused_by(FailureKind::AccountNotFound, e),
        _ => ServiceError::caused_by(FailureKind::StorageUnavailable, e),
    }
}

// Ids built by `parse` are never blank, but serde-constructed ones may be.
pub(crate) fn require_account_id(id: &AccountId) -> ServiceResult<()> {
    if id.as_str().trim().is_empty() {
        return Err(ServiceError::caused_by(
            FailureKind::InvalidAccountId,
            DomainError::validation("account_id", "must not be empty"),
        ));
    }
    Ok(())
}

pub(crate) fn require_user_id(id: &UserId) -> ServiceResult<()> {
    if id.as_str().trim().is_empty() {
        return Err(ServiceError::caused_by(
            FailureKind::InvalidUserId,
            DomainError::validation("user_id", "must not be empty"),
        ));
    }
    Ok(())
}
