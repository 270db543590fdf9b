use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use tinybank_core::{Entity, ErrorKind, UserId};
use tinybank_ledger::{Account, User};

use crate::store::{AccountStore, UserStore};

use super::account::{AccountService, DeletionSummary, require_user_id};
use super::error::{FailureKind, ServiceError, ServiceResult};

/// Users own accounts; every user is opened with exactly one.
pub struct UserService<U, S> {
    users: U,
    accounts: Arc<AccountService<S>>,
}

impl<U, S> UserService<U, S>
where
    U: UserStore,
    S: AccountStore,
{
    pub fn new(users: U, accounts: Arc<AccountService<S>>) -> Self {
        Self { users, accounts }
    }

    pub fn create_user(&self, name: &str) -> ServiceResult<User> {
        let user = User::create(name)
            .map_err(|e| ServiceError::caused_by(FailureKind::UserCreationFailed, e))?;

        self.accounts
            .create(user.id())
            .map_err(|e| ServiceError::rewrap(FailureKind::AccountCreationFailed, e))?;

        let user = self
            .users
            .insert(user)
            .map_err(|e| ServiceError::caused_by(FailureKind::UserCreationFailed, e))?;

        info!(user_id = %user.id(), "user created");
        Ok(user)
    }

    /// Soft-delete the user and every account they own.
    ///
    /// If any account could not be deleted the user is left active and the
    /// call can be repeated.
    pub fn delete_user(&self, user_id: &UserId) -> ServiceResult<DeletionSummary> {
        let mut user = self.find(user_id)?;

        let summary = self
            .accounts
            .delete_user_accounts(user_id)
            .map_err(|e| ServiceError::rewrap(FailureKind::AccountDeletionFailed, e))?;

        if let Some((account_id, cause)) = summary.failed.first() {
            warn!(
                user_id = %user_id,
                account_id = %account_id,
                failed = summary.failed.len(),
                "user left active: some accounts could not be deleted"
            );
            return Err(ServiceError::caused_by(
                FailureKind::AccountDeletionFailed,
                cause.clone(),
            ));
        }

        user.mark_deleted(Utc::now());
        self.users
            .update(user)
            .map_err(|e| ServiceError::caused_by(FailureKind::UserUpdateFailed, e))?;

        info!(user_id = %user_id, accounts = summary.deleted, "user deleted");
        Ok(summary)
    }

    pub fn get_users(&self, include_deleted: bool) -> ServiceResult<Vec<User>> {
        self.users
            .list(include_deleted)
            .map_err(|e| ServiceError::caused_by(FailureKind::StorageUnavailable, e))
    }

    pub fn get_accounts(&self, user_id: &UserId) -> ServiceResult<Vec<Account>> {
        let user = self.find(user_id)?;
        let accounts = self.accounts.get_user_accounts(user.id())?;
        debug!(user_id = %user_id, count = accounts.len(), "user accounts listed");
        Ok(accounts)
    }

    fn find(&self, user_id: &UserId) -> ServiceResult<User> {
        require_user_id(user_id)?;
        self.users.get(user_id).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ServiceError::caused_by(FailureKind::UserNotFound, e),
            _ => ServiceError::caused_by(FailureKind::StorageUnavailable, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tinybank_core::{AccountId, DomainError, DomainResult};

    use crate::locks::AccountLockRegistry;
    use crate::store::{InMemoryAccountStore, InMemoryUserStore};

    struct Fixture {
        accounts: Arc<AccountService<Arc<InMemoryAccountStore>>>,
        users: UserService<Arc<InMemoryUserStore>, Arc<InMemoryAccountStore>>,
    }

    fn fixture() -> Fixture {
        let accounts = Arc::new(AccountService::new(
            InMemoryAccountStore::arc(),
            AccountLockRegistry::arc(),
        ));
        let users = UserService::new(InMemoryUserStore::arc(), accounts.clone());
        Fixture { accounts, users }
    }

    /// Account store that accepts rows but refuses every update.
    struct FrozenAccountStore(InMemoryAccountStore);

    impl AccountStore for FrozenAccountStore {
        fn insert(&self, account: Account) -> DomainResult<Account> {
            self.0.insert(account)
        }

        fn get(&self, id: &AccountId) -> DomainResult<Account> {
            self.0.get(id)
        }

        fn get_by_user(&self, user_id: &UserId) -> DomainResult<Vec<Account>> {
            self.0.get_by_user(user_id)
        }

        fn update_bulk(&self, accounts: Vec<Account>) -> DomainResult<()> {
            self.0.update_bulk(accounts)
        }

        fn update(
            &self,
            _: &AccountId,
            _: &mut dyn FnMut(&mut Account) -> DomainResult<()>,
        ) -> DomainResult<Account> {
            Err(DomainError::storage("read-only replica"))
        }
    }

    #[test]
    fn create_user_opens_one_account() {
        let f = fixture();
        let user = f.users.create_user("ada").unwrap();
        assert_eq!(user.name(), "ada");

        let accounts = f.users.get_accounts(user.id()).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].balance(), 0);
        assert_eq!(accounts[0].user_id(), user.id());
    }

    #[test]
    fn create_user_rejects_blank_name() {
        let f = fixture();
        let err = f.users.create_user("  ").unwrap_err();
        assert_eq!(err.kind(), FailureKind::UserCreationFailed);
        assert_eq!(err.cause_kind(), Some(ErrorKind::Validation));
        assert!(f.users.get_users(true).unwrap().is_empty());
    }

    #[test]
    fn unknown_user_is_not_found() {
        let f = fixture();
        let ghost = UserId::parse("ghost").unwrap();
        assert_eq!(f.users.get_accounts(&ghost).unwrap_err().kind(), FailureKind::UserNotFound);
        assert_eq!(f.users.delete_user(&ghost).unwrap_err().kind(), FailureKind::UserNotFound);
    }

    #[test]
    fn delete_user_soft_deletes_user_and_accounts() {
        let f = fixture();
        let user = f.users.create_user("ada").unwrap();
        let keep = f.users.create_user("bob").unwrap();

        let summary = f.users.delete_user(user.id()).unwrap();
        assert_eq!(summary.deleted, 1);
        assert!(summary.is_complete());

        let visible: Vec<String> = f
            .users
            .get_users(false)
            .unwrap()
            .iter()
            .map(|u| u.name().to_owned())
            .collect();
        assert_eq!(visible, vec!["bob"]);
        assert_eq!(f.users.get_users(true).unwrap().len(), 2);

        let accounts = f.accounts.get_user_accounts(user.id()).unwrap();
        assert!(accounts.iter().all(Account::is_deleted));
        assert!(f
            .accounts
            .get_user_accounts(keep.id())
            .unwrap()
            .iter()
            .all(|a| !a.is_deleted()));
    }

    #[test]
    fn failed_account_deletion_keeps_user_active() {
        let accounts = Arc::new(AccountService::new(
            FrozenAccountStore(InMemoryAccountStore::new()),
            AccountLockRegistry::arc(),
        ));
        let users = UserService::new(InMemoryUserStore::new(), accounts);
        let user = users.create_user("ada").unwrap();

        let err = users.delete_user(user.id()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::AccountDeletionFailed);
        assert_eq!(err.cause_kind(), Some(ErrorKind::Storage));
        assert_eq!(users.get_users(false).unwrap().len(), 1);
    }
}
