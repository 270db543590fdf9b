//! Service graph wiring: stores -> services, shared by every handler.

use std::sync::Arc;

use tinybank_infra::locks::AccountLockRegistry;
use tinybank_infra::services::{AccountService, TransactionService, UserService};
use tinybank_infra::store::{InMemoryAccountStore, InMemoryTransactionStore, InMemoryUserStore};

pub type Accounts = Arc<AccountService<Arc<InMemoryAccountStore>>>;
pub type Users = UserService<Arc<InMemoryUserStore>, Arc<InMemoryAccountStore>>;
pub type Transactions = TransactionService<Accounts, Arc<InMemoryTransactionStore>>;

pub struct AppServices {
    pub users: Users,
    pub accounts: Accounts,
    pub transactions: Transactions,
}

/// In-memory wiring; all state lives for the life of the process.
pub fn build_services() -> AppServices {
    // Transactions and account deletion must contend on the same slots.
    let locks = AccountLockRegistry::arc();
    let accounts = Arc::new(AccountService::new(InMemoryAccountStore::arc(), locks.clone()));

    let users = UserService::new(InMemoryUserStore::arc(), accounts.clone());
    let transactions =
        TransactionService::new(accounts.clone(), InMemoryTransactionStore::arc(), locks);

    tracing::debug!("in-memory services wired");

    AppServices {
        users,
        accounts,
        transactions,
    }
}
