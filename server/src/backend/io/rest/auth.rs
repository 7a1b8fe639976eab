//! Bearer token extraction for authenticated endpoints.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::backend::io::rest::errors::error_response;
use crate::backend::AppState;
use shared::User;

/// The caller of an authenticated endpoint
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub access_token: String,
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(access_token) = bearer_token(&parts.headers) else {
            return Err((StatusCode::UNAUTHORIZED, "Please log in to continue").into_response());
        };

        match state.auth_service.authenticate(&access_token).await {
            Ok(user) => Ok(AuthUser { user, access_token }),
            Err(e) => Err(error_response("authenticate request", e)),
        }
    }
}
