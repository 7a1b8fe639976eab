use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use shared::{CreateRewardRequest, RedeemRewardRequest, RewardListRequest, UpdateRewardRequest};
use tracing::info;

use crate::backend::io::rest::{error_response, AuthUser, JsonBody};
use crate::backend::AppState;

async fn list_rewards(State(state): State<AppState>, auth: AuthUser, Query(query): Query<RewardListRequest>) -> Response {
    info!("GET /api/rewards - include_inactive: {}", query.include_inactive);

    match state.reward_service.list_rewards(&auth.user, query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list rewards", e),
    }
}

async fn create_reward(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(request): JsonBody<CreateRewardRequest>,
) -> Response {
    info!("POST /api/rewards - title: {}", request.title);

    match state.reward_service.create_reward(&auth.user, request).await {
        Ok(reward) => (StatusCode::CREATED, Json(reward)).into_response(),
        Err(e) => error_response("create reward", e),
    }
}

async fn get_reward(State(state): State<AppState>, auth: AuthUser, Path(reward_id): Path<String>) -> Response {
    info!("GET /api/rewards/{}", reward_id);

    match state.reward_service.get_reward(&auth.user, &reward_id).await {
        Ok(reward) => (StatusCode::OK, Json(reward)).into_response(),
        Err(e) => error_response("get reward", e),
    }
}

async fn update_reward(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(reward_id): Path<String>,
    JsonBody(request): JsonBody<UpdateRewardRequest>,
) -> Response {
    info!("PUT /api/rewards/{}", reward_id);

    match state.reward_service.update_reward(&auth.user, &reward_id, request).await {
        Ok(reward) => (StatusCode::OK, Json(reward)).into_response(),
        Err(e) => error_response("update reward", e),
    }
}

async fn delete_reward(State(state): State<AppState>, auth: AuthUser, Path(reward_id): Path<String>) -> Response {
    info!("DELETE /api/rewards/{}", reward_id);

    match state.reward_service.delete_reward(&auth.user, &reward_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete reward", e),
    }
}

/// The body is optional; without one the caller redeems for themselves
async fn redeem_reward(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(reward_id): Path<String>,
    request: Option<JsonBody<RedeemRewardRequest>>,
) -> Response {
    let request = request.map(|JsonBody(r)| r).unwrap_or_default();
    info!("POST /api/rewards/{}/redeem - for: {:?}", reward_id, request.user_id);

    match state.reward_service.redeem_reward(&auth.user, &reward_id, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("redeem reward", e),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rewards", get(list_rewards).post(create_reward))
        .route("/rewards/:id", get(get_reward).put(update_reward).delete(delete_reward))
        .route("/rewards/:id/redeem", post(redeem_reward))
}
