//! Home economy server: a household's chores, rewards, events, ledger and
//! learning tasks behind a bearer-authenticated REST API.

pub mod backend;

pub use backend::config::ServerConfig;
pub use backend::{create_router, initialize_backend, AppState};
