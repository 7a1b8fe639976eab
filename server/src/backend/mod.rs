//! # Backend Module
//!
//! Contains all non-UI logic of the home economy server.
//!
//! This module is the orchestration layer that brings together:
//! - **Domain**: Household rules for chores, rewards, events, the ledger and learning
//! - **Storage**: SQLite persistence through SQLx repositories
//! - **IO**: The REST API the web client talks to
//!
//! ## Architecture
//!
//! ```text
//! Web client (SPA / home-economy-client)
//!     ↓
//! IO Layer (REST API, handlers, bearer auth)
//!     ↓
//! Domain Layer (services)
//!     ↓
//! Storage Layer (repositories, SQLite)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::config::ServerConfig;
use crate::backend::domain::{
    AuthService, ChoreService, EventService, LearningService, RewardService, TransactionService, UserService,
};
use crate::backend::storage::DbConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub chore_service: ChoreService,
    pub reward_service: RewardService,
    pub event_service: EventService,
    pub transaction_service: TransactionService,
    pub learning_service: LearningService,
}

impl AppState {
    /// Wire every service to one database
    pub fn new(db: DbConnection, config: &ServerConfig) -> Self {
        Self {
            auth_service: AuthService::new(db.clone(), config.access_token_ttl, config.refresh_token_ttl),
            user_service: UserService::new(db.clone()),
            chore_service: ChoreService::new(db.clone()),
            reward_service: RewardService::new(db.clone()),
            event_service: EventService::new(db.clone()),
            transaction_service: TransactionService::new(db.clone()),
            learning_service: LearningService::new(db),
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &ServerConfig) -> Result<AppState> {
    info!("Setting up database at {}", config.database_url);
    let db = DbConnection::new(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;

    info!("Setting up domain model");
    Ok(AppState::new(db, config))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, cors_origin: &str) -> Result<Router> {
    // CORS setup to allow the web client to make requests
    let cors = CorsLayer::new()
        .allow_origin(
            cors_origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin {}", cors_origin))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .merge(io::rest::health::router())
        .merge(io::rest::auth_apis::router())
        .merge(io::rest::user_apis::router())
        .merge(io::rest::chore_apis::router())
        .merge(io::rest::reward_apis::router())
        .merge(io::rest::event_apis::router())
        .merge(io::rest::transaction_apis::router())
        .merge(io::rest::learning_apis::router());

    Ok(Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}
