//! Ledger entities: accounts, users, and the transactions that move money
//! between accounts.
//!
//! Pure domain logic only: no IO, no locking, no persistence concerns.

pub mod account;
pub mod transaction;
pub mod user;

pub use account::Account;
pub use transaction::{Transaction, TransactionType};
pub use user::User;
