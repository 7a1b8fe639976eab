//! Router fixtures for handler tests

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{AuthResponse, Role, User};
use tower::util::ServiceExt;

use crate::backend::config::ServerConfig;
use crate::backend::storage::DbConnection;
use crate::backend::{create_router, AppState};

pub struct TestApp {
    pub router: Router,
    pub parent: AuthResponse,
}

impl TestApp {
    pub fn parent_token(&self) -> &str {
        &self.parent.tokens.access_token
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, String) {
        send(&self.router, method, uri, token, body).await
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        expected: StatusCode,
    ) -> T {
        call(&self.router, method, uri, token, body, expected).await
    }

    /// Add a member as the parent and log them in
    pub async fn member(&self, name: &str, role: Role) -> AuthResponse {
        let email = format!("{}@example.com", name.to_lowercase());
        let _: User = self
            .call(
                Method::POST,
                "/api/users",
                Some(self.parent_token()),
                Some(serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": "password123",
                    "role": role,
                })),
                StatusCode::CREATED,
            )
            .await;
        self.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "email": email, "password": "password123" })),
            StatusCode::OK,
        )
        .await
    }
}

/// A router over a fresh database with one registered parent
pub async fn test_app() -> TestApp {
    test_app_with(ServerConfig::default()).await
}

pub async fn test_app_with(config: ServerConfig) -> TestApp {
    let db = DbConnection::init_in_memory().await.expect("Failed to create test database");
    let state = AppState::new(db, &config);
    let router = create_router(state, &config.cors_origin).expect("Failed to build router");

    let parent = call(
        &router,
        Method::POST,
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "household_name": "The Parkers",
            "name": "Robin",
            "email": "robin@example.com",
            "password": "password123",
        })),
        StatusCode::CREATED,
    )
    .await;
    TestApp { router, parent }
}

/// Send a request, returning the status and the raw body
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Send a request that must answer `expected` and decode the body
pub async fn call<T: DeserializeOwned>(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
    expected: StatusCode,
) -> T {
    let (status, text) = send(router, method, uri, token, body).await;
    assert_eq!(status, expected, "unexpected status for {}: {}", uri, text);
    serde_json::from_str(&text).unwrap()
}
