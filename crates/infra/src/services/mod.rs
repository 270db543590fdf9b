//! Application services: orchestration over the stores.
//!
//! Services never hold a store lock across calls. Every failure is a
//! [`ServiceError`] whose [`FailureKind`] names the step that failed.

mod account;
mod error;
mod transaction;
mod user;

pub use account::{AccountService, DeletionSummary};
pub use error::{FailureCategory, FailureKind, ServiceError, ServiceResult};
pub use transaction::{BalanceLedger, TransactionService};
pub use user::UserService;
