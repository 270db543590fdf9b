use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tinybank_core::{AccountId, DomainError, DomainResult, Entity, UserId};

/// Balance holder owned by a user.
///
/// Invariants:
/// - `balance >= 0` after every operation
/// - `user_id` is set at creation and never changes
/// - once `deleted_at` is set the balance is frozen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    user_id: UserId,
    balance: i64,
    deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Open a new, empty account for `user_id`.
    pub fn create(user_id: UserId) -> DomainResult<Self> {
        Self::restore(AccountId::new(), user_id, 0, None)
    }

    /// Rebuild an account from known state (stores, tests).
    pub fn restore(
        id: AccountId,
        user_id: UserId,
        balance: i64,
        deleted_at: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        if user_id.as_str().trim().is_empty() {
            return Err(DomainError::validation("user_id", "account owner must not be empty"));
        }
        if balance < 0 {
            return Err(DomainError::validation("balance", "balance must not be negative"));
        }
        Ok(Self {
            id,
            user_id,
            balance,
            deleted_at,
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Balance-mutation protocol: `balance += delta`.
    ///
    /// Fails without touching the balance when the account is closed, the sum
    /// overflows, or the result would be negative.
    pub fn add_balance(&mut self, delta: i64) -> DomainResult<i64> {
        if self.is_deleted() {
            return Err(DomainError::AccountClosed {
                id: self.id.to_string(),
            });
        }

        let next = self
            .balance
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("delta", "balance overflow"))?;

        if next < 0 {
            return Err(DomainError::InsufficientBalance {
                balance: self.balance,
                delta,
            });
        }

        self.balance = next;
        Ok(next)
    }

    /// Soft-delete. Returns `false` if the account was already deleted, in
    /// which case the original timestamp is kept.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) -> bool {
        if self.deleted_at.is_some() {
            return false;
        }
        self.deleted_at = Some(at);
        true
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
