use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use shared::{CreateEventRequest, EventListRequest, UpdateEventRequest};
use tracing::info;

use crate::backend::io::rest::{error_response, AuthUser, JsonBody};
use crate::backend::AppState;

async fn list_events(State(state): State<AppState>, auth: AuthUser, Query(query): Query<EventListRequest>) -> Response {
    info!("GET /api/events - upcoming: {}", query.upcoming);

    match state.event_service.list_events(&auth.user, query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list events", e),
    }
}

async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(request): JsonBody<CreateEventRequest>,
) -> Response {
    info!("POST /api/events - title: {}, starts_at: {}", request.title, request.starts_at);

    match state.event_service.create_event(&auth.user, request).await {
        Ok(event) => (StatusCode::CREATED, Json(event)).into_response(),
        Err(e) => error_response("create event", e),
    }
}

async fn get_event(State(state): State<AppState>, auth: AuthUser, Path(event_id): Path<String>) -> Response {
    info!("GET /api/events/{}", event_id);

    match state.event_service.get_event(&auth.user, &event_id).await {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e) => error_response("get event", e),
    }
}

async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<String>,
    JsonBody(request): JsonBody<UpdateEventRequest>,
) -> Response {
    info!("PUT /api/events/{}", event_id);

    match state.event_service.update_event(&auth.user, &event_id, request).await {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e) => error_response("update event", e),
    }
}

async fn delete_event(State(state): State<AppState>, auth: AuthUser, Path(event_id): Path<String>) -> Response {
    info!("DELETE /api/events/{}", event_id);

    match state.event_service.delete_event(&auth.user, &event_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete event", e),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/:id", get(get_event).put(update_event).delete(delete_event))
}
