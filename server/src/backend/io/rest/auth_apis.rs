//! Registration, login, token rotation and logout.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use shared::{LoginRequest, RefreshRequest, RegisterRequest};
use tracing::info;

use crate::backend::io::rest::auth::{bearer_token, AuthUser};
use crate::backend::io::rest::errors::error_response;
use crate::backend::io::rest::json::JsonBody;
use crate::backend::AppState;

async fn register(State(state): State<AppState>, JsonBody(request): JsonBody<RegisterRequest>) -> Response {
    info!("POST /api/auth/register - household: {}", request.household_name);

    match state.auth_service.register(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response("register", e),
    }
}

async fn login(State(state): State<AppState>, JsonBody(request): JsonBody<LoginRequest>) -> Response {
    info!("POST /api/auth/login");

    match state.auth_service.login(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("log in", e),
    }
}

async fn refresh(State(state): State<AppState>, JsonBody(request): JsonBody<RefreshRequest>) -> Response {
    info!("POST /api/auth/refresh");

    match state.auth_service.refresh(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("refresh session", e),
    }
}

/// Logging out twice, or with an already expired token, still succeeds
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    info!("POST /api/auth/logout");

    let Some(token) = bearer_token(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    match state.auth_service.logout(&token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("log out", e),
    }
}

async fn me(auth: AuthUser) -> Response {
    info!("GET /api/auth/me - user: {}", auth.user.id);
    (StatusCode::OK, Json(auth.user)).into_response()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::config::ServerConfig;
    use crate::backend::io::rest::test_helpers::{test_app, test_app_with};
    use axum::http::Method;
    use serde_json::json;
    use shared::{AuthResponse, Role, User};

    #[tokio::test]
    async fn test_register_returns_parent_and_tokens() {
        let app = test_app().await;

        assert_eq!(app.parent.user.role, Role::Parent);
        assert_eq!(app.parent.user.email, "robin@example.com");
        assert_eq!(app.parent.tokens.access_token.len(), 64);
        assert_ne!(app.parent.tokens.access_token, app.parent.tokens.refresh_token);

        let me: User = app
            .call(Method::GET, "/api/auth/me", Some(app.parent_token()), None, StatusCode::OK)
            .await;
        assert_eq!(me.id, app.parent.user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let app = test_app().await;

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "household_name": "Another",
                    "name": "Robin",
                    "email": "ROBIN@example.com",
                    "password": "password123",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "household_name": "", "name": "", "email": "nope", "password": "x" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_failure_is_unauthorized() {
        let app = test_app().await;

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "robin@example.com", "password": "wrong-password" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Invalid email or password");
    }

    #[tokio::test]
    async fn test_missing_or_bad_token_is_unauthorized() {
        let app = test_app().await;

        let (status, _) = app.send(Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.send(Method::GET, "/api/auth/me", Some("not-a-token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens_once() {
        let app = test_app().await;
        let refresh_token = app.parent.tokens.refresh_token.clone();

        let rotated: AuthResponse = app
            .call(
                Method::POST,
                "/api/auth/refresh",
                None,
                Some(json!({ "refresh_token": refresh_token })),
                StatusCode::OK,
            )
            .await;
        assert_ne!(rotated.tokens.access_token, app.parent.tokens.access_token);

        let (status, _) = app
            .send(Method::POST, "/api/auth/refresh", None, Some(json!({ "refresh_token": refresh_token })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // The old access token went with its session
        let (status, _) = app.send(Method::GET, "/api/auth/me", Some(app.parent_token()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_access_token_is_unauthorized() {
        let config = ServerConfig { access_token_ttl: chrono::Duration::zero(), ..ServerConfig::default() };
        let app = test_app_with(config).await;

        let (status, body) = app.send(Method::GET, "/api/auth/me", Some(app.parent_token()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Access token expired");
    }

    #[tokio::test]
    async fn test_longest_allowed_lifetimes_still_log_in() {
        let config = ServerConfig::from_lookup(|key| match key {
            "HOME_ECONOMY_ACCESS_TTL_SECS" | "HOME_ECONOMY_REFRESH_TTL_SECS" => {
                Some(crate::backend::config::MAX_TTL_SECS.to_string())
            }
            _ => None,
        })
        .unwrap();
        let app = test_app_with(config).await;

        let me: User = app
            .call(Method::GET, "/api/auth/me", Some(app.parent_token()), None, StatusCode::OK)
            .await;
        assert_eq!(me.id, app.parent.user.id);
    }

    #[tokio::test]
    async fn test_logout_revokes_session_and_is_idempotent() {
        let app = test_app().await;
        let token = app.parent_token().to_string();

        let (status, _) = app.send(Method::POST, "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.send(Method::POST, "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.send(Method::POST, "/api/auth/logout", None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
