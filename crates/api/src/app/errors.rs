use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tinybank_core::{AccountId, ErrorKind, UserId};
use tinybank_infra::services::{FailureKind, ServiceError};

/// Status and error code for a service failure.
///
/// Switches on the failure kind first, then on the root cause.
pub fn classify(err: &ServiceError) -> (StatusCode, &'static str) {
    match err.kind() {
        FailureKind::CompensationFailed => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "compensation_failed");
        }
        FailureKind::TransactionPersistFailed => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "persist_failed");
        }
        FailureKind::InvalidUserId | FailureKind::InvalidAccountId => {
            return (StatusCode::BAD_REQUEST, "invalid_id");
        }
        FailureKind::InvalidTransfer => return (StatusCode::BAD_REQUEST, "invalid_transfer"),
        _ => {}
    }

    match err.cause_kind() {
        Some(ErrorKind::Validation) => (StatusCode::BAD_REQUEST, "validation_error"),
        Some(ErrorKind::NotFound) => (StatusCode::NOT_FOUND, "not_found"),
        Some(ErrorKind::AlreadyExists) => (StatusCode::CONFLICT, "conflict"),
        Some(ErrorKind::InsufficientBalance) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_balance")
        }
        Some(ErrorKind::AccountClosed) => (StatusCode::UNPROCESSABLE_ENTITY, "account_closed"),
        Some(ErrorKind::Storage) => (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable"),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let (status, code) = classify(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, category = ?err.category(), "request failed");
    } else {
        tracing::info!(error = %err, "request rejected");
    }
    json_error(status, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_account_id(raw: &str) -> Result<AccountId, axum::response::Response> {
    AccountId::parse(raw).map_err(|e| {
        service_error_to_response(ServiceError::caused_by(FailureKind::InvalidAccountId, e))
    })
}

pub fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    UserId::parse(raw).map_err(|e| {
        service_error_to_response(ServiceError::caused_by(FailureKind::InvalidUserId, e))
    })
}
