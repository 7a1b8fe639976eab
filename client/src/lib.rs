//! Client library for the home economy API.
//!
//! The screens of the web app sit on three pieces: [`ApiClient`] for typed
//! requests with automatic session refresh, [`AuthContext`] for the logged
//! in user and their cache, and [`QueryClient`] for cached reads that mutations
//! invalidate.

pub mod api;
pub mod auth;
pub mod error;
pub mod query;
pub mod token_store;

pub use api::ApiClient;
pub use auth::AuthContext;
pub use error::ApiError;
pub use query::QueryClient;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
