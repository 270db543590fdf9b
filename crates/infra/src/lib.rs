//! Storage, locking and orchestration for the tinybank ledger.

pub mod locks;
pub mod services;
pub mod store;
