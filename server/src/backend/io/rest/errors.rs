use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::backend::domain::DomainError;

const INTERNAL_ERROR: &str = "Internal server error";

pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
    }
}

/// Turn a service failure into a response. Domain errors keep their
/// message; anything else is logged and hidden behind a generic one.
pub fn error_response(action: &str, err: anyhow::Error) -> Response {
    match err.downcast_ref::<DomainError>() {
        Some(domain_error) => {
            warn!("Failed to {}: {}", action, domain_error);
            (status_for(domain_error), domain_error.to_string()).into_response()
        }
        None => {
            error!("Failed to {}: {:#}", action, err);
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).into_response()
        }
    }
}
