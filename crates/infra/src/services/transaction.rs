//! Money movement: deposit, withdrawal, transfer.
//!
//! Each operation runs entirely under the per-account slots of every account
//! it touches, taken from [`AccountLockRegistry`] in ascending id order. Inside
//! the slots the record is built and validated first, then the balance legs are
//! applied one by one, then the record is appended. When a later step fails,
//! the legs already applied are reversed newest first, so a reported failure
//! leaves balances as they were. A reversal that itself fails is reported as
//! [`FailureKind::CompensationFailed`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use tinybank_core::{AccountId, DomainError, Entity};
use tinybank_ledger::{Account, Transaction};

use crate::locks::AccountLockRegistry;
use crate::store::TransactionStore;

use super::account::require_account_id;
use super::error::{FailureKind, ServiceError, ServiceResult};

/// Where balances live, as seen by [`TransactionService`].
///
/// `add_balance` must be atomic for one account: it either applies `delta`
/// completely or leaves the balance untouched.
pub trait BalanceLedger: Send + Sync {
    fn add_balance(&self, account_id: &AccountId, delta: i64) -> ServiceResult<Account>;
}

impl<L> BalanceLedger for Arc<L>
where
    L: BalanceLedger + ?Sized,
{
    fn add_balance(&self, account_id: &AccountId, delta: i64) -> ServiceResult<Account> {
        (**self).add_balance(account_id, delta)
    }
}

/// One balance change belonging to a transaction.
type Leg<'a> = (&'a AccountId, i64);

pub struct TransactionService<L, T> {
    ledger: L,
    transactions: T,
    locks: Arc<AccountLockRegistry>,
}

impl<L, T> TransactionService<L, T>
where
    L: BalanceLedger,
    T: TransactionStore,
{
    pub fn new(ledger: L, transactions: T, locks: Arc<AccountLockRegistry>) -> Self {
        Self {
            ledger,
            transactions,
            locks,
        }
    }

    pub fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: i64,
    ) -> ServiceResult<Transaction> {
        require_account_id(from)?;
        require_account_id(to)?;
        if from == to {
            return Err(ServiceError::caused_by(
                FailureKind::InvalidTransfer,
                DomainError::validation("to_account_id", "must differ from from_account_id"),
            ));
        }

        self.locks.with_locked(&[from, to], || {
            let transaction = Transaction::new_transfer(from.clone(), to.clone(), amount)
                .map_err(|e| ServiceError::caused_by(FailureKind::TransactionCreationFailed, e))?;
            self.commit(transaction, &[(from, -amount), (to, amount)])
        })
    }

    pub fn deposit(&self, to: &AccountId, amount: i64) -> ServiceResult<Transaction> {
        require_account_id(to)?;

        self.locks.with_locked(&[to], || {
            let transaction = Transaction::new_deposit(to.clone(), amount)
                .map_err(|e| ServiceError::caused_by(FailureKind::TransactionCreationFailed, e))?;
            self.commit(transaction, &[(to, amount)])
        })
    }

    pub fn withdraw(&self, from: &AccountId, amount: i64) -> ServiceResult<Transaction> {
        require_account_id(from)?;

        self.locks.with_locked(&[from], || {
            let transaction = Transaction::new_withdrawal(from.clone(), amount)
                .map_err(|e| ServiceError::caused_by(FailureKind::TransactionCreationFailed, e))?;
            self.commit(transaction, &[(from, -amount)])
        })
    }

    /// Transactions touching `account_id` in `[from, to]`, oldest first.
    ///
    /// Takes no account slots: a concurrent operation is either fully visible
    /// or not at all.
    pub fn get_account_transaction_history(
        &self,
        account_id: &AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ServiceResult<Vec<Transaction>> {
        require_account_id(account_id)?;
        self.transactions
            .get_account_transactions(account_id, from, to)
            .map_err(|e| ServiceError::caused_by(FailureKind::StorageUnavailable, e))
    }

    /// Apply `legs` in order, then append `transaction`. Caller holds the slots.
    fn commit(&self, transaction: Transaction, legs: &[Leg<'_>]) -> ServiceResult<Transaction> {
        for (applied, (account_id, delta)) in legs.iter().enumerate() {
            if let Err(e) = self.ledger.add_balance(account_id, *delta) {
                let failure = ServiceError::rewrap(FailureKind::BalanceUpdateFailed, e);
                return Err(self.reverse(&legs[..applied], failure));
            }
        }

        match self.transactions.insert(transaction) {
            Ok(stored) => {
                debug!(
                    transaction_id = %stored.id(),
                    tx_type = %stored.tx_type(),
                    amount = stored.amount(),
                    "transaction committed"
                );
                Ok(stored)
            }
            Err(e) => {
                let failure = ServiceError::caused_by(FailureKind::TransactionPersistFailed, e);
                Err(self.reverse(legs, failure))
            }
        }
    }

    /// Undo `applied` newest first and return the error to report.
    ///
    /// Every leg is attempted even after one fails, to leave as little drift
    /// as possible.
    fn reverse(&self, applied: &[Leg<'_>], failure: ServiceError) -> ServiceError {
        let mut compensation_failure = None;
        for (account_id, delta) in applied.iter().rev() {
            if let Err(e) = self.ledger.add_balance(account_id, -delta) {
                error!(
                    account_id = %account_id,
                    delta = -delta,
                    error = %e,
                    original = %failure,
                    "failed to reverse balance change; balances diverge from ledger"
                );
                compensation_failure.get_or_insert(e);
            }
        }

        match compensation_failure {
            Some(e) => ServiceError::rewrap(FailureKind::CompensationFailed, e),
            None => {
                if !applied.is_empty() {
                    warn!(error = %failure, legs = applied.len(), "partial transaction reversed");
                }
                failure
            }
        }
    }
}
