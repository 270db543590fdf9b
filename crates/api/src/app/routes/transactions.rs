use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use tinybank_infra::services::ServiceResult;
use tinybank_ledger::Transaction;

use super::blocking;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/transaction", post(transfer))
        .route("/account/:id/deposit", post(deposit))
        .route("/account/:id/withdraw", post(withdraw))
        .route("/account/:id/transactions", get(account_history))
}

fn created(result: ServiceResult<Transaction>) -> axum::response::Response {
    match result {
        Ok(tx) => (StatusCode::CREATED, Json(dto::transaction_to_json(&tx))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::TransferRequest>,
) -> axum::response::Response {
    let from = match errors::parse_account_id(&body.from_account) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let to = match errors::parse_account_id(&body.to_account) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match blocking(move || services.transactions.transfer(&from, &to, body.amount)).await {
        Ok(result) => created(result),
        Err(resp) => resp,
    }
}

pub async fn deposit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AmountRequest>,
) -> axum::response::Response {
    let account_id = match errors::parse_account_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match blocking(move || services.transactions.deposit(&account_id, body.amount)).await {
        Ok(result) => created(result),
        Err(resp) => resp,
    }
}

pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AmountRequest>,
) -> axum::response::Response {
    let account_id = match errors::parse_account_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match blocking(move || services.transactions.withdraw(&account_id, body.amount)).await {
        Ok(result) => created(result),
        Err(resp) => resp,
    }
}

pub async fn account_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::HistoryQuery>,
) -> axum::response::Response {
    let (from, to) = match query.window(Utc::now().date_naive()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let account_id = match errors::parse_account_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .transactions
        .get_account_transaction_history(&account_id, from, to)
    {
        Ok(history) => {
            let items = history.iter().map(dto::transaction_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
