//! Chore endpoints: catalogue management plus the
//! open → completed → approved lifecycle.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use shared::{ChoreListRequest, CreateChoreRequest, UpdateChoreRequest};
use tracing::info;

use crate::backend::io::rest::{error_response, AuthUser, JsonBody};
use crate::backend::AppState;

async fn list_chores(State(state): State<AppState>, auth: AuthUser, Query(filter): Query<ChoreListRequest>) -> Response {
    info!("GET /api/chores - filter: {:?}", filter);

    match state.chore_service.list_chores(&auth.user, filter).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list chores", e),
    }
}

async fn create_chore(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(request): JsonBody<CreateChoreRequest>,
) -> Response {
    info!("POST /api/chores - title: {}", request.title);

    match state.chore_service.create_chore(&auth.user, request).await {
        Ok(chore) => (StatusCode::CREATED, Json(chore)).into_response(),
        Err(e) => error_response("create chore", e),
    }
}

async fn get_chore(State(state): State<AppState>, auth: AuthUser, Path(chore_id): Path<String>) -> Response {
    info!("GET /api/chores/{}", chore_id);

    match state.chore_service.get_chore(&auth.user, &chore_id).await {
        Ok(chore) => (StatusCode::OK, Json(chore)).into_response(),
        Err(e) => error_response("get chore", e),
    }
}

async fn update_chore(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chore_id): Path<String>,
    JsonBody(request): JsonBody<UpdateChoreRequest>,
) -> Response {
    info!("PUT /api/chores/{}", chore_id);

    match state.chore_service.update_chore(&auth.user, &chore_id, request).await {
        Ok(chore) => (StatusCode::OK, Json(chore)).into_response(),
        Err(e) => error_response("update chore", e),
    }
}

async fn delete_chore(State(state): State<AppState>, auth: AuthUser, Path(chore_id): Path<String>) -> Response {
    info!("DELETE /api/chores/{}", chore_id);

    match state.chore_service.delete_chore(&auth.user, &chore_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete chore", e),
    }
}

async fn complete_chore(State(state): State<AppState>, auth: AuthUser, Path(chore_id): Path<String>) -> Response {
    info!("POST /api/chores/{}/complete", chore_id);

    match state.chore_service.complete_chore(&auth.user, &chore_id).await {
        Ok(chore) => (StatusCode::OK, Json(chore)).into_response(),
        Err(e) => error_response("complete chore", e),
    }
}

async fn approve_chore(State(state): State<AppState>, auth: AuthUser, Path(chore_id): Path<String>) -> Response {
    info!("POST /api/chores/{}/approve", chore_id);

    match state.chore_service.approve_chore(&auth.user, &chore_id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("approve chore", e),
    }
}

async fn reject_chore(State(state): State<AppState>, auth: AuthUser, Path(chore_id): Path<String>) -> Response {
    info!("POST /api/chores/{}/reject", chore_id);

    match state.chore_service.reject_chore(&auth.user, &chore_id).await {
        Ok(chore) => (StatusCode::OK, Json(chore)).into_response(),
        Err(e) => error_response("reject chore", e),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chores", get(list_chores).post(create_chore))
        .route("/chores/:id", get(get_chore).put(update_chore).delete(delete_chore))
        .route("/chores/:id/complete", post(complete_chore))
        .route("/chores/:id/approve", post(approve_chore))
        .route("/chores/:id/reject", post(reject_chore))
}
