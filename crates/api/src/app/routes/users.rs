use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use super::blocking;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/user/:id", delete(delete_user))
        .route("/user/:id/accounts", get(list_user_accounts))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    match services.users.create_user(&body.name) {
        Ok(user) => (StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::UsersQuery>,
) -> axum::response::Response {
    let include_deleted =
        match dto::parse_bool_param("return-deleted", query.return_deleted.as_deref()) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

    match services.users.get_users(include_deleted) {
        Ok(users) => {
            let users = users.iter().map(dto::user_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "users": users }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match blocking(move || services.users.delete_user(&user_id)).await {
        Ok(Ok(_)) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => errors::service_error_to_response(e),
        Err(resp) => resp,
    }
}

pub async fn list_user_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.users.get_accounts(&user_id) {
        Ok(accounts) => {
            let items = accounts.iter().map(dto::account_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
