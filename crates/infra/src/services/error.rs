//! Service-level (orchestration) errors.

use thiserror::Error;

use tinybank_core::{DomainError, ErrorKind};

/// Which service step failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidUserId,
    InvalidAccountId,
    /// A transfer whose source and destination are the same account.
    InvalidTransfer,
    AccountCreationFailed,
    AccountNotFound,
    BalanceUpdateFailed,
    TransactionCreationFailed,
    TransactionPersistFailed,
    /// A reversal step failed: balances no longer match the ledger.
    CompensationFailed,
    AccountDeletionFailed,
    /// A read could not be served because the store is unusable.
    StorageUnavailable,
    UserCreationFailed,
    UserNotFound,
    UserUpdateFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidUserId => "invalid user ID",
            FailureKind::InvalidAccountId => "invalid account ID",
            FailureKind::InvalidTransfer => "invalid transfer",
            FailureKind::AccountCreationFailed => "failed to create account",
            FailureKind::AccountNotFound => "account not found",
            FailureKind::BalanceUpdateFailed => "failed to add balance",
            FailureKind::TransactionCreationFailed => "failed to create transaction",
            FailureKind::TransactionPersistFailed => "failed to insert transaction",
            FailureKind::CompensationFailed => "failed to reverse partial transaction",
            FailureKind::AccountDeletionFailed => "failed to delete accounts",
            FailureKind::StorageUnavailable => "storage unavailable",
            FailureKind::UserCreationFailed => "failed to create user",
            FailureKind::UserNotFound => "failed to get user",
            FailureKind::UserUpdateFailed => "failed to update user",
        }
    }
}

impl core::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a failed operation left anything behind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FailureCategory {
    /// Nothing changed; the request can be corrected and retried.
    Rejected,
    /// Storage was unusable; retrying later may succeed.
    Unavailable,
    /// State is inconsistent and needs operator attention.
    Fatal,
}

/// Operation failure: a [`FailureKind`] tag plus the domain error that caused
/// it, if any.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}{}", render_cause(.cause))]
pub struct ServiceError {
    kind: FailureKind,
    #[source]
    cause: Option<DomainError>,
}

fn render_cause(cause: &Option<DomainError>) -> String {
    cause.as_ref().map(|c| format!(": {c}")).unwrap_or_default()
}

impl ServiceError {
    pub fn new(kind: FailureKind) -> Self {
        Self { kind, cause: None }
    }

    pub fn caused_by(kind: FailureKind, cause: DomainError) -> Self {
        Self {
            kind,
            cause: Some(cause),
        }
    }

    /// Re-tag a lower-level service error, keeping its root cause.
    pub fn rewrap(kind: FailureKind, inner: ServiceError) -> Self {
        Self {
            kind,
            cause: inner.cause,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn cause(&self) -> Option<&DomainError> {
        self.cause.as_ref()
    }

    pub fn cause_kind(&self) -> Option<ErrorKind> {
        self.cause.as_ref().map(DomainError::kind)
    }

    pub fn category(&self) -> FailureCategory {
        if self.kind == FailureKind::CompensationFailed {
            return FailureCategory::Fatal;
        }
        match self.cause_kind() {
            Some(ErrorKind::Storage) => FailureCategory::Unavailable,
            _ => FailureCategory::Rejected,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
