//! Storage layer for the ledger. Provides storage for:
//! - Accounts and their owner index ([`AccountStore`])
//! - The append-only transaction log with its date index ([`TransactionStore`])
//! - Users ([`UserStore`])
//!
//! Each store is a trait so services can be exercised against failing
//! doubles; the in-memory implementations use one readers-writer lock per
//! store and hand out clones, never references into their maps.

mod accounts;
mod transactions;
mod users;

pub use accounts::{AccountStore, InMemoryAccountStore};
pub use transactions::{InMemoryTransactionStore, TransactionStore};
pub use users::{InMemoryUserStore, UserStore};
