use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/account/:id", get(get_account))
        .route("/account/:id/balance", post(add_balance))
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let account_id = match errors::parse_account_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.accounts.get(&account_id) {
        Ok(account) => (StatusCode::OK, Json(dto::account_to_json(&account))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Apply a signed balance delta directly, without recording a transaction.
pub async fn add_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddBalanceRequest>,
) -> axum::response::Response {
    let account_id = match errors::parse_account_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.accounts.add_balance(&account_id, body.balance) {
        Ok(account) => (StatusCode::CREATED, Json(dto::account_to_json(&account))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
