//! # REST API Interface Layer
//!
//! HTTP endpoints of the home economy server, all mounted under `/api`.
//! Every module exposes a `router()` that is merged into the main router.
//!
//! ## Error Format
//!
//! Failures carry a plain text message; the status code tells the kind:
//! 400 validation (including unreadable JSON bodies), 401 authentication, 403 role, 404 missing (or another
//! household's record), 409 conflict, 500 anything unexpected.

pub mod auth;
pub mod errors;
pub mod json;

pub mod auth_apis;
pub mod chore_apis;
pub mod event_apis;
pub mod health;
pub mod learning_apis;
pub mod reward_apis;
pub mod transaction_apis;
pub mod user_apis;

#[cfg(test)]
pub mod test_helpers;

pub use auth::AuthUser;
pub use errors::error_response;
pub use json::JsonBody;
