//! JSON request bodies that fail in the API's error format.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    response::Response,
    Json,
};
use serde::de::DeserializeOwned;

use crate::backend::domain::DomainError;
use crate::backend::io::rest::errors::error_response;

/// Like `Json<T>`, but a body that is missing, malformed or of the wrong
/// shape is a 400 with a plain text message
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(error_response(
                "read request body",
                DomainError::Validation(rejection.body_text()).into(),
            )),
        }
    }
}
