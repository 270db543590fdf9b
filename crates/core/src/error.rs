//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Fieldless classification of a [`DomainError`].
///
/// Callers (services, the HTTP layer) switch on this instead of matching
/// message text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AlreadyExists,
    InsufficientBalance,
    AccountClosed,
    Storage,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Orchestration failures are wrapped by the service
/// layer, which keeps one of these as the root cause.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An entity could not be constructed from the given input.
    #[error("validation failed on `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    /// A requested entity is absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An insert collided with an existing identifier.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// Applying `delta` to `balance` would leave the account negative.
    #[error("insufficient balance: balance {balance}, delta {delta}")]
    InsufficientBalance { balance: i64, delta: i64 },

    /// The account was soft-deleted and no longer accepts balance changes.
    #[error("account is closed: {id}")]
    AccountClosed { id: String },

    /// The backing store is unusable (e.g. a poisoned lock).
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &'static str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation { .. } => ErrorKind::Validation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            DomainError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            DomainError::AccountClosed { .. } => ErrorKind::AccountClosed,
            DomainError::Storage(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        assert_eq!(DomainError::validation("amount", "x").kind(), ErrorKind::Validation);
        assert_eq!(DomainError::not_found("account", "a").kind(), ErrorKind::NotFound);
        assert_eq!(
            DomainError::InsufficientBalance { balance: 1, delta: -2 }.kind(),
            ErrorKind::InsufficientBalance
        );
        assert_eq!(DomainError::storage("poisoned").kind(), ErrorKind::Storage);
    }

    #[test]
    fn messages_name_the_entity() {
        let err = DomainError::already_exists("transaction", "tx-1");
        assert_eq!(err.to_string(), "transaction already exists: tx-1");
    }
}
