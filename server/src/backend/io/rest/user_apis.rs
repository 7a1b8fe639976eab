use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use shared::{CreateUserRequest, UpdateUserRequest};
use tracing::info;

use crate::backend::io::rest::{error_response, AuthUser, JsonBody};
use crate::backend::AppState;

async fn list_users(State(state): State<AppState>, auth: AuthUser) -> Response {
    info!("GET /api/users");

    match state.user_service.list_members(&auth.user).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list users", e),
    }
}

async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Response {
    info!("POST /api/users - name: {}, role: {}", request.name, request.role.as_str());

    match state.user_service.create_member(&auth.user, request).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => error_response("create user", e),
    }
}

async fn get_user(State(state): State<AppState>, auth: AuthUser, Path(user_id): Path<String>) -> Response {
    info!("GET /api/users/{}", user_id);

    match state.user_service.get_member(&auth.user, &user_id).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => error_response("get user", e),
    }
}

async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Response {
    info!("PUT /api/users/{}", user_id);

    match state.user_service.update_member(&auth.user, &user_id, request).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => error_response("update user", e),
    }
}

async fn delete_user(State(state): State<AppState>, auth: AuthUser, Path(user_id): Path<String>) -> Response {
    info!("DELETE /api/users/{}", user_id);

    match state.user_service.delete_member(&auth.user, &user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete user", e),
    }
}

async fn user_summary(State(state): State<AppState>, auth: AuthUser, Path(user_id): Path<String>) -> Response {
    info!("GET /api/users/{}/summary", user_id);

    match state.transaction_service.summary(&auth.user, &user_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response("get balance summary", e),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/users/:id/summary", get(user_summary))
}
