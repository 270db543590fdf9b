//! Strongly-typed identifiers used across the ledger.
//!
//! Identifiers are opaque strings. Freshly minted ones come from a UUIDv7, but
//! callers (HTTP paths, tests) may hand in any non-empty value, so the
//! newtypes wrap a `String` rather than a `Uuid`. Ordering is lexicographic,
//! which is the total order used for lock acquisition.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a user (account owner).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Identifier of an account (balance holder).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

/// Identifier of a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $field:literal) => {
        impl $t {
            /// Mint a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7().simple().to_string())
            }

            /// Parse a caller-supplied identifier. Blank input is rejected.
            pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
                let raw = raw.as_ref().trim();
                if raw.is_empty() {
                    return Err(DomainError::validation($field, "identifier must not be empty"));
                }
                Ok(Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

impl_string_newtype!(UserId, "user_id");
impl_string_newtype!(AccountId, "account_id");
impl_string_newtype!(TransactionId, "transaction_id");
