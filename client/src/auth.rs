//! Session state shared by the screens: who is logged in, and what they may do.

use std::sync::{Arc, RwLock};

use shared::{LoginRequest, RegisterRequest, Role, User};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::query::QueryClient;

/// The logged in user plus the query cache of their session. Cached reads
/// are dropped whenever the session starts, ends or changes hands.
#[derive(Clone)]
pub struct AuthContext {
    api: ApiClient,
    queries: QueryClient,
    user: Arc<RwLock<Option<User>>>,
}

impl AuthContext {
    pub fn new(api: ApiClient) -> Self {
        let queries = QueryClient::new(api.clone());
        Self::with_queries(api, queries)
    }

    /// Use an existing cache, e.g. one with a custom stale time
    pub fn with_queries(api: ApiClient, queries: QueryClient) -> Self {
        Self { api, queries, user: Arc::new(RwLock::new(None)) }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn is_parent(&self) -> bool {
        self.current_user().map_or(false, |user| user.role == Role::Parent)
    }

    fn set_user(&self, user: Option<User>) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = user;
    }

    fn switch_user(&self, user: Option<User>) {
        self.queries.clear();
        self.set_user(user);
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = LoginRequest { email: email.to_string(), password: password.to_string() };
        let auth = self.api.login(&request).await?;
        info!("Logged in as {}", auth.user.id);
        self.switch_user(Some(auth.user.clone()));
        Ok(auth.user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let auth = self.api.register(request).await?;
        info!("Registered household for {}", auth.user.id);
        self.switch_user(Some(auth.user.clone()));
        Ok(auth.user)
    }

    /// Forget the session locally even when the server call fails
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!("Logout request failed: {}", e);
        }
        self.switch_user(None);
    }

    /// Pick up a stored session, e.g. on start-up. `None` when there is no
    /// session or it can no longer be refreshed.
    pub async fn restore(&self) -> Result<Option<User>, ApiError> {
        if !self.api.has_session()? {
            self.switch_user(None);
            return Ok(None);
        }

        match self.api.me().await {
            Ok(user) => {
                info!("Restored session for {}", user.id);
                self.switch_user(Some(user.clone()));
                Ok(Some(user))
            }
            Err(ApiError::Unauthorized) => {
                self.switch_user(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Reload the current user, e.g. after a balance changed
    pub async fn reload(&self) -> Result<User, ApiError> {
        let user = self.api.me().await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }
}
