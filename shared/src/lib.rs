use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod format;
pub mod sudoku;
pub mod validation;

pub use sudoku::{SudokuPuzzle, SudokuSubmission};
pub use validation::{FieldError, ValidationError};

/// Generate a record ID in format: "<kind>::<uuid>"
pub fn generate_id(kind: &str) -> String {
    format!("{}::{}", kind, uuid::Uuid::new_v4().simple())
}

/// Split a record ID into its kind prefix and unique part
pub fn parse_id(id: &str) -> Result<(&str, &str), IdError> {
    match id.split_once("::") {
        Some((kind, rest)) if !kind.is_empty() && !rest.is_empty() && !rest.contains("::") => {
            Ok((kind, rest))
        }
        _ => Err(IdError::InvalidFormat(id.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdError {
    InvalidFormat(String),
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdError::InvalidFormat(id) => write!(f, "Invalid ID format: {}", id),
        }
    }
}

impl std::error::Error for IdError {}

/// Error returned when a stored enum value cannot be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown {} value: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

// ---------------------------------------------------------------------------
// Households and users
// ---------------------------------------------------------------------------

/// The tenant grouping all members of a family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

impl Household {
    pub fn generate_id() -> String {
        generate_id("household")
    }
}

/// Role of a household member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Teen,
    Child,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Teen => "teen",
            Role::Child => "child",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent" => Ok(Role::Parent),
            "teen" => Ok(Role::Teen),
            "child" => Ok(Role::Child),
            other => Err(ParseEnumError { kind: "role", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub household_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub points_balance: i64,
    pub money_balance: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn generate_id() -> String {
        generate_id("user")
    }

    pub fn is_parent(&self) -> bool {
        self.role == Role::Parent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
}

/// Points and money position of a single member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub user_id: String,
    pub points_balance: i64,
    pub money_balance: f64,
    pub points_earned: i64,
    pub points_spent: i64,
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub household_name: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Bearer token pair issued at login and rotated on refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// RFC 3339
    pub access_expires_at: String,
    /// RFC 3339
    pub refresh_expires_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: AuthTokens,
}

// ---------------------------------------------------------------------------
// Chores
// ---------------------------------------------------------------------------

/// Lifecycle of a chore: Open -> Completed -> Approved, Completed -> Open on rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoreStatus {
    Open,
    Completed,
    Approved,
}

impl ChoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChoreStatus::Open => "open",
            ChoreStatus::Completed => "completed",
            ChoreStatus::Approved => "approved",
        }
    }
}

impl FromStr for ChoreStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ChoreStatus::Open),
            "completed" => Ok(ChoreStatus::Completed),
            "approved" => Ok(ChoreStatus::Approved),
            other => Err(ParseEnumError { kind: "chore status", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chore {
    pub id: String,
    pub household_id: String,
    pub title: String,
    pub description: String,
    pub points: i64,
    pub money_reward: f64,
    /// YYYY-MM-DD
    pub due_date: Option<String>,
    pub assignee_id: Option<String>,
    pub status: ChoreStatus,
    pub completed_by: Option<String>,
    pub completed_at: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Chore {
    pub fn generate_id() -> String {
        generate_id("chore")
    }

    /// An open chore whose due date is before `today` (YYYY-MM-DD)
    pub fn is_overdue(&self, today: &str) -> bool {
        match (&self.status, &self.due_date) {
            (ChoreStatus::Open, Some(due)) => due.as_str() < today,
            _ => false,
        }
    }

    /// Whether `user_id` is allowed to mark this chore completed
    pub fn can_be_completed_by(&self, user_id: &str) -> bool {
        self.assignee_id.as_deref().map_or(true, |assignee| assignee == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChoreRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub points: i64,
    #[serde(default)]
    pub money_reward: f64,
    pub due_date: Option<String>,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateChoreRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub points: Option<i64>,
    pub money_reward: Option<f64>,
    pub due_date: Option<String>,
    pub assignee_id: Option<String>,
    /// Remove the current assignee
    #[serde(default)]
    pub clear_assignee: bool,
    /// Remove the due date; wins over `due_date`
    #[serde(default)]
    pub clear_due_date: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoreListRequest {
    pub status: Option<ChoreStatus>,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoreListResponse {
    pub chores: Vec<Chore>,
}

/// Result of approving a completed chore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproveChoreResponse {
    pub chore: Chore,
    pub transaction: Transaction,
}

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub household_id: String,
    pub title: String,
    pub description: String,
    pub cost_points: i64,
    pub cost_money: f64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Reward {
    pub fn generate_id() -> String {
        generate_id("reward")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRewardRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cost_points: i64,
    #[serde(default)]
    pub cost_money: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRewardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cost_points: Option<i64>,
    pub cost_money: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardListRequest {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardListResponse {
    pub rewards: Vec<Reward>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedeemRewardRequest {
    /// Parents may redeem on behalf of another member
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedeemRewardResponse {
    pub transaction: Transaction,
    pub success_message: String,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub household_id: String,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    /// RFC 3339
    pub starts_at: String,
    /// RFC 3339
    pub ends_at: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Event {
    pub fn generate_id() -> String {
        generate_id("event")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: Option<String>,
    pub starts_at: String,
    pub ends_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventListRequest {
    #[serde(default)]
    pub upcoming: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventListResponse {
    pub events: Vec<Event>,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Why a ledger entry was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    ChoreReward,
    RewardRedemption,
    Allowance,
    Adjustment,
    LearningReward,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::ChoreReward => "chore_reward",
            TransactionKind::RewardRedemption => "reward_redemption",
            TransactionKind::Allowance => "allowance",
            TransactionKind::Adjustment => "adjustment",
            TransactionKind::LearningReward => "learning_reward",
        }
    }

    /// Kinds a parent may record by hand
    pub fn is_manual(&self) -> bool {
        matches!(self, TransactionKind::Allowance | TransactionKind::Adjustment)
    }
}

impl FromStr for TransactionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chore_reward" => Ok(TransactionKind::ChoreReward),
            "reward_redemption" => Ok(TransactionKind::RewardRedemption),
            "allowance" => Ok(TransactionKind::Allowance),
            "adjustment" => Ok(TransactionKind::Adjustment),
            "learning_reward" => Ok(TransactionKind::LearningReward),
            other => Err(ParseEnumError { kind: "transaction kind", value: other.to_string() }),
        }
    }
}

/// A ledger entry adjusting a user's points and/or money balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub household_id: String,
    pub user_id: String,
    pub kind: TransactionKind,
    pub description: String,
    /// Positive for credit, negative for debit
    pub points: i64,
    pub money: f64,
    /// User balances after this entry
    pub points_balance: i64,
    pub money_balance: f64,
    /// Chore, reward or learning task that caused the entry
    pub related_id: Option<String>,
    pub created_at: String,
}

impl Transaction {
    pub fn generate_id() -> String {
        generate_id("transaction")
    }

    pub fn is_credit(&self) -> bool {
        self.points > 0 || self.money > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub user_id: String,
    pub kind: TransactionKind,
    pub description: String,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub money: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionListRequest {
    pub user_id: Option<String>,
    /// Cursor for pagination - transaction ID to start after
    pub after: Option<String>,
    /// Maximum number of transactions to return
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

// ---------------------------------------------------------------------------
// Learning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStatus {
    Open,
    Completed,
}

impl LearningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStatus::Open => "open",
            LearningStatus::Completed => "completed",
        }
    }
}

impl FromStr for LearningStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(LearningStatus::Open),
            "completed" => Ok(LearningStatus::Completed),
            other => Err(ParseEnumError { kind: "learning status", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningTask {
    pub id: String,
    pub household_id: String,
    pub title: String,
    pub description: String,
    pub subject: Option<String>,
    pub points: i64,
    pub assignee_id: Option<String>,
    pub status: LearningStatus,
    pub completed_by: Option<String>,
    pub completed_at: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl LearningTask {
    pub fn generate_id() -> String {
        generate_id("learning")
    }

    pub fn can_be_completed_by(&self, user_id: &str) -> bool {
        self.assignee_id.as_deref().map_or(true, |assignee| assignee == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLearningTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub subject: Option<String>,
    pub points: i64,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateLearningTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub points: Option<i64>,
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub clear_assignee: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningTaskListResponse {
    pub tasks: Vec<LearningTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteLearningTaskResponse {
    pub task: LearningTask,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SudokuResult {
    pub score: u32,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
