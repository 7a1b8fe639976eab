//! # API Client
//!
//! Typed access to every `/api` endpoint of the home economy server.
//!
//! ## Key Responsibilities
//!
//! - **Bearer Auth**: Attaches the stored access token to each request
//! - **Token Rotation**: On a 401 the stored refresh token is exchanged once
//!   and the original request retried once; a refused refresh clears the
//!   stored tokens and surfaces `ApiError::Unauthorized`
//! - **Error Mapping**: Non-success responses become `ApiError::Status`
//!   carrying the server's plain text message

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use shared::{
    ApproveChoreResponse, AuthResponse, BalanceSummary, Chore, ChoreListRequest, ChoreListResponse,
    CompleteLearningTaskResponse, CreateChoreRequest, CreateEventRequest, CreateLearningTaskRequest,
    CreateRewardRequest, CreateTransactionRequest, CreateUserRequest, Event, EventListResponse, HealthResponse,
    LearningTask, LearningTaskListResponse, LoginRequest, RedeemRewardRequest, RedeemRewardResponse,
    RegisterRequest, Reward, RewardListResponse, SudokuPuzzle, SudokuResult, SudokuSubmission, Transaction,
    TransactionListRequest, TransactionListResponse, UpdateChoreRequest, UpdateEventRequest,
    UpdateLearningTaskRequest, UpdateRewardRequest, UpdateUserRequest, User, UserListResponse,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ApiError, FALLBACK_MESSAGE};
use crate::token_store::TokenStore;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const API_URL_VAR: &str = "HOME_ECONOMY_API_URL";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Whether a request carries the stored access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Bearer,
}

/// API client for communicating with the backend server
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    /// Serializes refreshes so parallel 401s rotate the tokens only once
    refresh_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a client for `HOME_ECONOMY_API_URL`, or the local default
    pub fn new(tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let base_url = std::env::var(API_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(base_url, tokens)
    }

    /// Create a new API client with a custom base URL
    pub fn with_base_url(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Whether a token pair is stored
    pub fn has_session(&self) -> Result<bool, ApiError> {
        Ok(self.tokens.load()?.is_some())
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Send once. Returns the response and the access token it carried.
    async fn execute(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        access: Access,
    ) -> Result<(Response, Option<String>), ApiError> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }

        let mut used_token = None;
        if access == Access::Bearer {
            if let Some(tokens) = self.tokens.load()? {
                request = request.bearer_auth(&tokens.access_token);
                used_token = Some(tokens.access_token);
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("{} {}", method, path);
        Ok((request.send().await?, used_token))
    }

    /// An authenticated request, refreshing the session once on a 401
    async fn authed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let (response, used_token) = self.execute(&method, path, query, body.as_ref(), Access::Bearer).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return decode(response).await;
        }

        debug!("{} {} was unauthorized, refreshing session", method, path);
        if !self.refresh_after(used_token.as_deref()).await? {
            return Err(ApiError::Unauthorized);
        }

        let (retried, _) = self.execute(&method, path, query, body.as_ref(), Access::Bearer).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!("{} {} still unauthorized after refresh", method, path);
            self.tokens.clear()?;
            return Err(ApiError::Unauthorized);
        }
        decode(retried).await
    }

    async fn public<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, ApiError> {
        let (response, _) = self.execute(&method, path, &[], body.as_ref(), Access::Public).await?;
        decode(response).await
    }

    /// Rotate the stored tokens unless someone else already did since
    /// `failed_token` was sent. False means the session is gone.
    async fn refresh_after(&self, failed_token: Option<&str>) -> Result<bool, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let Some(stored) = self.tokens.load()? else {
            return Ok(false);
        };
        if failed_token.is_some_and(|failed| failed != stored.access_token) {
            debug!("Session was refreshed by a concurrent request");
            return Ok(true);
        }

        let body = json!({ "refresh_token": stored.refresh_token });
        let (response, _) = self
            .execute(&Method::POST, "/auth/refresh", &[], Some(&body), Access::Public)
            .await?;
        if !response.status().is_success() {
            warn!("Session refresh refused with {}", response.status());
            self.tokens.clear()?;
            return Ok(false);
        }

        let auth: AuthResponse = decode(response).await?;
        self.tokens.save(&auth.tokens)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.public(Method::GET, "/health", None).await
    }

    /// Create a household and its first parent; the new session is stored
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse = self.public(Method::POST, "/auth/register", Some(to_value(request)?)).await?;
        self.tokens.save(&auth.tokens)?;
        Ok(auth)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse = self.public(Method::POST, "/auth/login", Some(to_value(request)?)).await?;
        self.tokens.save(&auth.tokens)?;
        Ok(auth)
    }

    /// Rotate the stored session now. False when there is none to rotate.
    pub async fn refresh(&self) -> Result<bool, ApiError> {
        self.refresh_after(None).await
    }

    /// End the session on the server and forget the tokens locally. The
    /// local tokens are cleared even when the server cannot be reached.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .execute(&Method::POST, "/auth/logout", &[], None, Access::Bearer)
            .await;
        self.tokens.clear()?;
        match result {
            Ok((response, _)) => decode::<()>(response).await,
            Err(e) => Err(e),
        }
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.authed(Method::GET, "/auth/me", &[], None).await
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub async fn list_users(&self) -> Result<UserListResponse, ApiError> {
        self.authed(Method::GET, "/users", &[], None).await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, ApiError> {
        self.authed(Method::POST, "/users", &[], Some(to_value(request)?)).await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, ApiError> {
        self.authed(Method::GET, &format!("/users/{}", user_id), &[], None).await
    }

    pub async fn update_user(&self, user_id: &str, request: &UpdateUserRequest) -> Result<User, ApiError> {
        self.authed(Method::PUT, &format!("/users/{}", user_id), &[], Some(to_value(request)?))
            .await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        self.authed(Method::DELETE, &format!("/users/{}", user_id), &[], None).await
    }

    pub async fn user_summary(&self, user_id: &str) -> Result<BalanceSummary, ApiError> {
        self.authed(Method::GET, &format!("/users/{}/summary", user_id), &[], None).await
    }

    // -----------------------------------------------------------------------
    // Chores
    // -----------------------------------------------------------------------

    pub async fn list_chores(&self, filter: &ChoreListRequest) -> Result<ChoreListResponse, ApiError> {
        let mut query = Vec::new();
        if let Some(status) = &filter.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(assignee_id) = &filter.assignee_id {
            query.push(("assignee_id", assignee_id.clone()));
        }
        self.authed(Method::GET, "/chores", &query, None).await
    }

    pub async fn create_chore(&self, request: &CreateChoreRequest) -> Result<Chore, ApiError> {
        self.authed(Method::POST, "/chores", &[], Some(to_value(request)?)).await
    }

    pub async fn get_chore(&self, chore_id: &str) -> Result<Chore, ApiError> {
        self.authed(Method::GET, &format!("/chores/{}", chore_id), &[], None).await
    }

    pub async fn update_chore(&self, chore_id: &str, request: &UpdateChoreRequest) -> Result<Chore, ApiError> {
        self.authed(Method::PUT, &format!("/chores/{}", chore_id), &[], Some(to_value(request)?))
            .await
    }

    pub async fn delete_chore(&self, chore_id: &str) -> Result<(), ApiError> {
        self.authed(Method::DELETE, &format!("/chores/{}", chore_id), &[], None).await
    }

    pub async fn complete_chore(&self, chore_id: &str) -> Result<Chore, ApiError> {
        self.authed(Method::POST, &format!("/chores/{}/complete", chore_id), &[], None).await
    }

    pub async fn approve_chore(&self, chore_id: &str) -> Result<ApproveChoreResponse, ApiError> {
        self.authed(Method::POST, &format!("/chores/{}/approve", chore_id), &[], None).await
    }

    pub async fn reject_chore(&self, chore_id: &str) -> Result<Chore, ApiError> {
        self.authed(Method::POST, &format!("/chores/{}/reject", chore_id), &[], None).await
    }

    // -----------------------------------------------------------------------
    // Rewards
    // -----------------------------------------------------------------------

    pub async fn list_rewards(&self, include_inactive: bool) -> Result<RewardListResponse, ApiError> {
        let query = [("include_inactive", include_inactive.to_string())];
        self.authed(Method::GET, "/rewards", &query, None).await
    }

    pub async fn create_reward(&self, request: &CreateRewardRequest) -> Result<Reward, ApiError> {
        self.authed(Method::POST, "/rewards", &[], Some(to_value(request)?)).await
    }

    pub async fn get_reward(&self, reward_id: &str) -> Result<Reward, ApiError> {
        self.authed(Method::GET, &format!("/rewards/{}", reward_id), &[], None).await
    }

    pub async fn update_reward(&self, reward_id: &str, request: &UpdateRewardRequest) -> Result<Reward, ApiError> {
        self.authed(Method::PUT, &format!("/rewards/{}", reward_id), &[], Some(to_value(request)?))
            .await
    }

    pub async fn delete_reward(&self, reward_id: &str) -> Result<(), ApiError> {
        self.authed(Method::DELETE, &format!("/rewards/{}", reward_id), &[], None).await
    }

    pub async fn redeem_reward(
        &self,
        reward_id: &str,
        request: &RedeemRewardRequest,
    ) -> Result<RedeemRewardResponse, ApiError> {
        self.authed(Method::POST, &format!("/rewards/{}/redeem", reward_id), &[], Some(to_value(request)?))
            .await
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub async fn list_events(&self, upcoming: bool) -> Result<EventListResponse, ApiError> {
        let query = [("upcoming", upcoming.to_string())];
        self.authed(Method::GET, "/events", &query, None).await
    }

    pub async fn create_event(&self, request: &CreateEventRequest) -> Result<Event, ApiError> {
        self.authed(Method::POST, "/events", &[], Some(to_value(request)?)).await
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Event, ApiError> {
        self.authed(Method::GET, &format!("/events/{}", event_id), &[], None).await
    }

    pub async fn update_event(&self, event_id: &str, request: &UpdateEventRequest) -> Result<Event, ApiError> {
        self.authed(Method::PUT, &format!("/events/{}", event_id), &[], Some(to_value(request)?))
            .await
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<(), ApiError> {
        self.authed(Method::DELETE, &format!("/events/{}", event_id), &[], None).await
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    pub async fn list_transactions(&self, request: &TransactionListRequest) -> Result<TransactionListResponse, ApiError> {
        let mut query = Vec::new();
        if let Some(user_id) = &request.user_id {
            query.push(("user_id", user_id.clone()));
        }
        if let Some(after) = &request.after {
            query.push(("after", after.clone()));
        }
        if let Some(limit) = request.limit {
            query.push(("limit", limit.to_string()));
        }
        self.authed(Method::GET, "/transactions", &query, None).await
    }

    pub async fn create_transaction(&self, request: &CreateTransactionRequest) -> Result<Transaction, ApiError> {
        self.authed(Method::POST, "/transactions", &[], Some(to_value(request)?)).await
    }

    // -----------------------------------------------------------------------
    // Learning
    // -----------------------------------------------------------------------

    pub async fn list_learning_tasks(&self) -> Result<LearningTaskListResponse, ApiError> {
        self.authed(Method::GET, "/learning/tasks", &[], None).await
    }

    pub async fn create_learning_task(&self, request: &CreateLearningTaskRequest) -> Result<LearningTask, ApiError> {
        self.authed(Method::POST, "/learning/tasks", &[], Some(to_value(request)?)).await
    }

    pub async fn get_learning_task(&self, task_id: &str) -> Result<LearningTask, ApiError> {
        self.authed(Method::GET, &format!("/learning/tasks/{}", task_id), &[], None).await
    }

    pub async fn update_learning_task(
        &self,
        task_id: &str,
        request: &UpdateLearningTaskRequest,
    ) -> Result<LearningTask, ApiError> {
        self.authed(Method::PUT, &format!("/learning/tasks/{}", task_id), &[], Some(to_value(request)?))
            .await
    }

    pub async fn delete_learning_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.authed(Method::DELETE, &format!("/learning/tasks/{}", task_id), &[], None).await
    }

    pub async fn complete_learning_task(&self, task_id: &str) -> Result<CompleteLearningTaskResponse, ApiError> {
        self.authed(Method::POST, &format!("/learning/tasks/{}/complete", task_id), &[], None)
            .await
    }

    pub async fn new_sudoku(&self) -> Result<SudokuPuzzle, ApiError> {
        self.authed(Method::GET, "/learning/sudoku", &[], None).await
    }

    pub async fn submit_sudoku(&self, submission: &SudokuSubmission) -> Result<SudokuResult, ApiError> {
        self.authed(Method::POST, "/learning/sudoku/submit", &[], Some(to_value(submission)?))
            .await
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(value)?)
}

/// Decode a success body, or turn a failure into `ApiError::Status`.
/// An empty body decodes as JSON `null`, so `()` works for 204 responses.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let text = String::from_utf8_lossy(&bytes).trim().to_string();
        let message = if text.is_empty() { FALLBACK_MESSAGE.to_string() } else { text };
        return Err(ApiError::Status { status: status.as_u16(), message });
    }

    if bytes.is_empty() {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
