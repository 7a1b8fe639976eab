//! # Query Cache
//!
//! Read-through cache for GET responses, keyed by a string per query.
//! Entries go stale after a fixed time. Mutations invalidate every key
//! under the prefixes they affect, so the next read refetches.
//!
//! ## Keys
//!
//! - `users`, `users/<id>/summary`
//! - `chores`, `chores?<filter>`
//! - `rewards?inactive=<bool>`
//! - `events?upcoming=<bool>`
//! - `transactions?<query>`
//! - `learning/tasks`

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared::{
    ApproveChoreResponse, BalanceSummary, Chore, ChoreListRequest, ChoreListResponse, CompleteLearningTaskResponse,
    CreateChoreRequest, CreateEventRequest, CreateLearningTaskRequest, CreateRewardRequest, CreateTransactionRequest,
    CreateUserRequest, Event, EventListResponse, LearningTask, LearningTaskListResponse, RedeemRewardRequest,
    RedeemRewardResponse, Reward, RewardListResponse, SudokuResult, SudokuSubmission, Transaction,
    TransactionListRequest, TransactionListResponse, UpdateChoreRequest, UpdateEventRequest, UpdateLearningTaskRequest,
    UpdateRewardRequest, UpdateUserRequest, User, UserListResponse,
};
use tracing::debug;

use crate::api::ApiClient;
use crate::error::ApiError;

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

const BALANCES: &[&str] = &["users", "transactions"];
/// Everything that names a member
const MEMBERS: &[&str] = &["users", "transactions", "chores", "learning"];

struct CacheEntry {
    value: Value,
    fetched_at: Instant,
}

#[derive(Clone)]
pub struct QueryClient {
    api: ApiClient,
    stale_time: Duration,
    cache: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl QueryClient {
    pub fn new(api: ApiClient) -> Self {
        Self::with_stale_time(api, DEFAULT_STALE_TIME)
    }

    pub fn with_stale_time(api: ApiClient, stale_time: Duration) -> Self {
        Self { api, stale_time, cache: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let entry = cache.get(key)?;
        if entry.fetched_at.elapsed() >= self.stale_time {
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ApiError> {
        let value = serde_json::to_value(value)?;
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(key.to_string(), CacheEntry { value, fetched_at: Instant::now() });
        Ok(())
    }

    /// Return the fresh cached value for `key`, or run `fetch` and cache it
    pub async fn fetch<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.cached(key) {
            debug!("Query cache hit for {}", key);
            return Ok(value);
        }

        debug!("Query cache miss for {}", key);
        let value = fetch(self.api.clone()).await?;
        self.store(key, &value)?;
        Ok(value)
    }

    /// Drop every entry whose key starts with `prefix`
    pub fn invalidate(&self, prefix: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.retain(|key, _| !key.starts_with(prefix));
    }

    fn invalidate_all(&self, prefixes: &[&str]) {
        for prefix in prefixes {
            self.invalidate(prefix);
        }
    }

    /// Forget everything; the session owner calls this when the user changes
    pub fn clear(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn users(&self) -> Result<UserListResponse, ApiError> {
        self.fetch("users", |api| async move { api.list_users().await }).await
    }

    pub async fn summary(&self, user_id: &str) -> Result<BalanceSummary, ApiError> {
        let key = format!("users/{}/summary", user_id);
        let user_id = user_id.to_string();
        self.fetch(&key, |api| async move { api.user_summary(&user_id).await }).await
    }

    pub async fn chores(&self, filter: &ChoreListRequest) -> Result<ChoreListResponse, ApiError> {
        let key = format!(
            "chores?status={}&assignee={}",
            filter.status.as_ref().map_or("", |s| s.as_str()),
            filter.assignee_id.as_deref().unwrap_or("")
        );
        let filter = filter.clone();
        self.fetch(&key, |api| async move { api.list_chores(&filter).await }).await
    }

    pub async fn rewards(&self, include_inactive: bool) -> Result<RewardListResponse, ApiError> {
        let key = format!("rewards?inactive={}", include_inactive);
        self.fetch(&key, |api| async move { api.list_rewards(include_inactive).await }).await
    }

    pub async fn events(&self, upcoming: bool) -> Result<EventListResponse, ApiError> {
        let key = format!("events?upcoming={}", upcoming);
        self.fetch(&key, |api| async move { api.list_events(upcoming).await }).await
    }

    pub async fn transactions(&self, request: &TransactionListRequest) -> Result<TransactionListResponse, ApiError> {
        let key = format!(
            "transactions?user={}&after={}&limit={}",
            request.user_id.as_deref().unwrap_or(""),
            request.after.as_deref().unwrap_or(""),
            request.limit.map(|l| l.to_string()).unwrap_or_default()
        );
        let request = request.clone();
        self.fetch(&key, |api| async move { api.list_transactions(&request).await }).await
    }

    pub async fn learning_tasks(&self) -> Result<LearningTaskListResponse, ApiError> {
        self.fetch("learning/tasks", |api| async move { api.list_learning_tasks().await }).await
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub async fn create_chore(&self, request: &CreateChoreRequest) -> Result<Chore, ApiError> {
        let chore = self.api.create_chore(request).await?;
        self.invalidate("chores");
        Ok(chore)
    }

    pub async fn update_chore(&self, chore_id: &str, request: &UpdateChoreRequest) -> Result<Chore, ApiError> {
        let chore = self.api.update_chore(chore_id, request).await?;
        self.invalidate("chores");
        Ok(chore)
    }

    pub async fn delete_chore(&self, chore_id: &str) -> Result<(), ApiError> {
        self.api.delete_chore(chore_id).await?;
        self.invalidate("chores");
        Ok(())
    }

    pub async fn complete_chore(&self, chore_id: &str) -> Result<Chore, ApiError> {
        let chore = self.api.complete_chore(chore_id).await?;
        self.invalidate("chores");
        Ok(chore)
    }

    pub async fn approve_chore(&self, chore_id: &str) -> Result<ApproveChoreResponse, ApiError> {
        let response = self.api.approve_chore(chore_id).await?;
        self.invalidate("chores");
        self.invalidate_all(BALANCES);
        Ok(response)
    }

    pub async fn reject_chore(&self, chore_id: &str) -> Result<Chore, ApiError> {
        let chore = self.api.reject_chore(chore_id).await?;
        self.invalidate("chores");
        Ok(chore)
    }

    pub async fn create_reward(&self, request: &CreateRewardRequest) -> Result<Reward, ApiError> {
        let reward = self.api.create_reward(request).await?;
        self.invalidate("rewards");
        Ok(reward)
    }

    pub async fn update_reward(&self, reward_id: &str, request: &UpdateRewardRequest) -> Result<Reward, ApiError> {
        let reward = self.api.update_reward(reward_id, request).await?;
        self.invalidate("rewards");
        Ok(reward)
    }

    pub async fn delete_reward(&self, reward_id: &str) -> Result<(), ApiError> {
        self.api.delete_reward(reward_id).await?;
        self.invalidate("rewards");
        Ok(())
    }

    pub async fn redeem_reward(
        &self,
        reward_id: &str,
        request: &RedeemRewardRequest,
    ) -> Result<RedeemRewardResponse, ApiError> {
        let response = self.api.redeem_reward(reward_id, request).await?;
        self.invalidate_all(BALANCES);
        Ok(response)
    }

    pub async fn create_event(&self, request: &CreateEventRequest) -> Result<Event, ApiError> {
        let event = self.api.create_event(request).await?;
        self.invalidate("events");
        Ok(event)
    }

    pub async fn update_event(&self, event_id: &str, request: &UpdateEventRequest) -> Result<Event, ApiError> {
        let event = self.api.update_event(event_id, request).await?;
        self.invalidate("events");
        Ok(event)
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<(), ApiError> {
        self.api.delete_event(event_id).await?;
        self.invalidate("events");
        Ok(())
    }

    pub async fn create_transaction(&self, request: &CreateTransactionRequest) -> Result<Transaction, ApiError> {
        let transaction = self.api.create_transaction(request).await?;
        self.invalidate_all(BALANCES);
        Ok(transaction)
    }

    pub async fn create_learning_task(&self, request: &CreateLearningTaskRequest) -> Result<LearningTask, ApiError> {
        let task = self.api.create_learning_task(request).await?;
        self.invalidate("learning");
        Ok(task)
    }

    pub async fn update_learning_task(
        &self,
        task_id: &str,
        request: &UpdateLearningTaskRequest,
    ) -> Result<LearningTask, ApiError> {
        let task = self.api.update_learning_task(task_id, request).await?;
        self.invalidate("learning");
        Ok(task)
    }

    pub async fn delete_learning_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.api.delete_learning_task(task_id).await?;
        self.invalidate("learning");
        Ok(())
    }

    pub async fn complete_learning_task(&self, task_id: &str) -> Result<CompleteLearningTaskResponse, ApiError> {
        let response = self.api.complete_learning_task(task_id).await?;
        self.invalidate("learning");
        self.invalidate_all(BALANCES);
        Ok(response)
    }

    pub async fn submit_sudoku(&self, submission: &SudokuSubmission) -> Result<SudokuResult, ApiError> {
        let result = self.api.submit_sudoku(submission).await?;
        self.invalidate_all(BALANCES);
        Ok(result)
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, ApiError> {
        let user = self.api.create_user(request).await?;
        self.invalidate("users");
        Ok(user)
    }

    pub async fn update_user(&self, user_id: &str, request: &UpdateUserRequest) -> Result<User, ApiError> {
        let user = self.api.update_user(user_id, request).await?;
        self.invalidate("users");
        Ok(user)
    }

    /// Removing a member also drops their entries and unassigns their work
    pub async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        self.api.delete_user(user_id).await?;
        self.invalidate_all(MEMBERS);
        Ok(())
    }
}
