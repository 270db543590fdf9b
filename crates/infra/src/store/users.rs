use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tinybank_core::{DomainError, DomainResult, Entity, UserId};
use tinybank_ledger::User;

pub trait UserStore: Send + Sync {
    fn insert(&self, user: User) -> DomainResult<User>;
    fn get(&self, id: &UserId) -> DomainResult<User>;
    /// Replace an existing user. Fails with `NotFound` if absent.
    fn update(&self, user: User) -> DomainResult<User>;
    fn list(&self, include_deleted: bool) -> DomainResult<Vec<User>>;
}

impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    fn insert(&self, user: User) -> DomainResult<User> {
        (**self).insert(user)
    }

    fn get(&self, id: &UserId) -> DomainResult<User> {
        (**self).get(id)
    }

    fn update(&self, user: User) -> DomainResult<User> {
        (**self).update(user)
    }

    fn list(&self, include_deleted: bool) -> DomainResult<Vec<User>> {
        (**self).list(include_deleted)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn poisoned<T>(_: T) -> DomainError {
        DomainError::storage("user store lock poisoned")
    }
}

impl UserStore for InMemoryUserStore {
    fn insert(&self, user: User) -> DomainResult<User> {
        let mut users = self.users.write().map_err(Self::poisoned)?;
        if users.contains_key(user.id()) {
            return Err(DomainError::already_exists("user", user.id()));
        }
        users.insert(user.id().clone(), user.clone());
        Ok(user)
    }

    fn get(&self, id: &UserId) -> DomainResult<User> {
        let users = self.users.read().map_err(Self::poisoned)?;
        users
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("user", id))
    }

    fn update(&self, user: User) -> DomainResult<User> {
        let mut users = self.users.write().map_err(Self::poisoned)?;
        match users.get_mut(user.id()) {
            Some(stored) => {
                *stored = user.clone();
                Ok(user)
            }
            None => Err(DomainError::not_found("user", user.id())),
        }
    }

    fn list(&self, include_deleted: bool) -> DomainResult<Vec<User>> {
        let users = self.users.read().map_err(Self::poisoned)?;
        Ok(users
            .values()
            .filter(|u| include_deleted || !u.is_deleted())
            .cloned()
            .collect())
    }
}
