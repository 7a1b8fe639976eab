//! Learning tasks and the Sudoku mini-game.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use shared::{CreateLearningTaskRequest, SudokuSubmission, UpdateLearningTaskRequest};
use tracing::info;

use crate::backend::io::rest::{error_response, AuthUser, JsonBody};
use crate::backend::AppState;

async fn list_tasks(State(state): State<AppState>, auth: AuthUser) -> Response {
    info!("GET /api/learning/tasks");

    match state.learning_service.list_tasks(&auth.user).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list learning tasks", e),
    }
}

async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(request): JsonBody<CreateLearningTaskRequest>,
) -> Response {
    info!("POST /api/learning/tasks - title: {}", request.title);

    match state.learning_service.create_task(&auth.user, request).await {
        Ok(task) => (StatusCode::CREATED, Json(task)).into_response(),
        Err(e) => error_response("create learning task", e),
    }
}

async fn get_task(State(state): State<AppState>, auth: AuthUser, Path(task_id): Path<String>) -> Response {
    info!("GET /api/learning/tasks/{}", task_id);

    match state.learning_service.get_task(&auth.user, &task_id).await {
        Ok(task) => (StatusCode::OK, Json(task)).into_response(),
        Err(e) => error_response("get learning task", e),
    }
}

async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
    JsonBody(request): JsonBody<UpdateLearningTaskRequest>,
) -> Response {
    info!("PUT /api/learning/tasks/{}", task_id);

    match state.learning_service.update_task(&auth.user, &task_id, request).await {
        Ok(task) => (StatusCode::OK, Json(task)).into_response(),
        Err(e) => error_response("update learning task", e),
    }
}

async fn delete_task(State(state): State<AppState>, auth: AuthUser, Path(task_id): Path<String>) -> Response {
    info!("DELETE /api/learning/tasks/{}", task_id);

    match state.learning_service.delete_task(&auth.user, &task_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete learning task", e),
    }
}

async fn complete_task(State(state): State<AppState>, auth: AuthUser, Path(task_id): Path<String>) -> Response {
    info!("POST /api/learning/tasks/{}/complete", task_id);

    match state.learning_service.complete_task(&auth.user, &task_id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("complete learning task", e),
    }
}

async fn new_sudoku(State(state): State<AppState>, auth: AuthUser) -> Response {
    info!("GET /api/learning/sudoku - user: {}", auth.user.id);

    match state.learning_service.new_puzzle(&auth.user).await {
        Ok(puzzle) => (StatusCode::OK, Json(puzzle)).into_response(),
        Err(e) => error_response("issue sudoku", e),
    }
}

async fn submit_sudoku(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(submission): JsonBody<SudokuSubmission>,
) -> Response {
    info!("POST /api/learning/sudoku/submit - puzzle: {}", submission.puzzle_id);

    match state.learning_service.submit_sudoku(&auth.user, submission).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response("submit sudoku", e),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/learning/tasks", get(list_tasks).post(create_task))
        .route("/learning/tasks/:id", get(get_task).put(update_task).delete(delete_task))
        .route("/learning/tasks/:id/complete", post(complete_task))
        .route("/learning/sudoku", get(new_sudoku))
        .route("/learning/sudoku/submit", post(submit_sudoku))
}
