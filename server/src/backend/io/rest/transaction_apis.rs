use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use shared::{CreateTransactionRequest, TransactionListRequest};
use tracing::info;

use crate::backend::io::rest::{error_response, AuthUser, JsonBody};
use crate::backend::AppState;

async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TransactionListRequest>,
) -> Response {
    info!("GET /api/transactions - query: {:?}", query);

    match state.transaction_service.list_transactions(&auth.user, query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list transactions", e),
    }
}

async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(request): JsonBody<CreateTransactionRequest>,
) -> Response {
    info!(
        "POST /api/transactions - user: {}, kind: {}, points: {}, money: {}",
        request.user_id,
        request.kind.as_str(),
        request.points,
        request.money
    );

    match state.transaction_service.create_adjustment(&auth.user, request).await {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(e) => error_response("create transaction", e),
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/transactions", get(list_transactions).post(create_transaction))
}
