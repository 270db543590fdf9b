use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tinybank_core::{AccountId, DomainError, DomainResult, Entity, TransactionId};

/// Kind of money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Transfer => "transfer",
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a completed money movement (append-only).
///
/// | type       | from     | to       |
/// |------------|----------|----------|
/// | deposit    | absent   | required |
/// | withdrawal | required | absent   |
/// | transfer   | required | required |
///
/// `amount` is strictly positive for every type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    created_at: DateTime<Utc>,
    from_account_id: Option<AccountId>,
    to_account_id: Option<AccountId>,
    #[serde(rename = "type")]
    tx_type: TransactionType,
    amount: i64,
}

impl Transaction {
    pub fn new_deposit(to_account_id: AccountId, amount: i64) -> DomainResult<Self> {
        Self::restore(
            TransactionId::new(),
            Utc::now(),
            TransactionType::Deposit,
            None,
            Some(to_account_id),
            amount,
        )
    }

    pub fn new_withdrawal(from_account_id: AccountId, amount: i64) -> DomainResult<Self> {
        Self::restore(
            TransactionId::new(),
            Utc::now(),
            TransactionType::Withdrawal,
            Some(from_account_id),
            None,
            amount,
        )
    }

    pub fn new_transfer(
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> DomainResult<Self> {
        Self::restore(
            TransactionId::new(),
            Utc::now(),
            TransactionType::Transfer,
            Some(from_account_id),
            Some(to_account_id),
            amount,
        )
    }

    /// Rebuild a record with an explicit id and timestamp, running the same
    /// validation as the constructors.
    pub fn restore(
        id: TransactionId,
        created_at: DateTime<Utc>,
        tx_type: TransactionType,
        from_account_id: Option<AccountId>,
        to_account_id: Option<AccountId>,
        amount: i64,
    ) -> DomainResult<Self> {
        let tx = Self {
            id,
            created_at,
            from_account_id: from_account_id.filter(|id| !id.as_str().trim().is_empty()),
            to_account_id: to_account_id.filter(|id| !id.as_str().trim().is_empty()),
            tx_type,
            amount,
        };
        tx.validate()?;
        Ok(tx)
    }

    fn validate(&self) -> DomainResult<()> {
        // Amount is checked before any type-specific field.
        if self.amount <= 0 {
            return Err(DomainError::validation("amount", "amount must be greater than zero"));
        }

        let (from_required, to_required) = match self.tx_type {
            TransactionType::Deposit => (false, true),
            TransactionType::Withdrawal => (true, false),
            TransactionType::Transfer => (true, true),
        };

        match (from_required, self.from_account_id.is_some()) {
            (true, false) => {
                return Err(DomainError::validation("from_account_id", "from account ID is required"));
            }
            (false, true) => {
                return Err(DomainError::validation(
                    "from_account_id",
                    format!("{} must not have a from account", self.tx_type),
                ));
            }
            _ => {}
        }

        match (to_required, self.to_account_id.is_some()) {
            (true, false) => {
                Err(DomainError::validation("to_account_id", "to account ID is required"))
            }
            (false, true) => Err(DomainError::validation(
                "to_account_id",
                format!("{} must not have a to account", self.tx_type),
            )),
            _ => Ok(()),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn from_account_id(&self) -> Option<&AccountId> {
        self.from_account_id.as_ref()
    }

    pub fn to_account_id(&self) -> Option<&AccountId> {
        self.to_account_id.as_ref()
    }

    pub fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Whether `account_id` is the sender or the receiver.
    pub fn involves(&self, account_id: &AccountId) -> bool {
        self.from_account_id.as_ref() == Some(account_id)
            || self.to_account_id.as_ref() == Some(account_id)
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
