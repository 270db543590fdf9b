use axum::http::StatusCode;
use axum::Router;

use crate::app::errors;

pub mod accounts;
pub mod system;
pub mod transactions;
pub mod users;

/// Router for every resource endpoint.
pub fn router() -> Router {
    Router::new()
        .merge(users::router())
        .merge(accounts::router())
        .merge(transactions::router())
}

/// Run service work that may wait on account slots off the async workers.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, axum::response::Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!(error = %e, "blocking service task failed");
        errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "request task failed")
    })
}
