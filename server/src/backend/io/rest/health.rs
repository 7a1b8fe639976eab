use axum::{routing::get, Json, Router};
use shared::HealthResponse;

use crate::backend::AppState;

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string() })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
