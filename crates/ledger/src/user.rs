use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tinybank_core::{DomainError, DomainResult, Entity, UserId};

/// Account owner. Carries only a display name and a soft-delete marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn create(name: impl Into<String>) -> DomainResult<Self> {
        Self::restore(UserId::new(), name, None)
    }

    pub fn restore(
        id: UserId,
        name: impl Into<String>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name", "invalid empty name"));
        }
        Ok(Self { id, name, deleted_at })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn mark_deleted(&mut self, at: DateTime<Utc>) -> bool {
        if self.deleted_at.is_some() {
            return false;
        }
        self.deleted_at = Some(at);
        true
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_user() {
        let user = User::create("ada").unwrap();
        assert_eq!(user.name(), "ada");
        assert!(!user.is_deleted());
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = User::create("  ").unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "name", .. }));
    }
}
