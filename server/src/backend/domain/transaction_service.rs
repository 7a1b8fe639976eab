use anyhow::Result;
use shared::validation::validate_create_transaction;
use shared::{
    BalanceSummary, CreateTransactionRequest, PaginationInfo, Transaction, TransactionListRequest,
    TransactionListResponse, User,
};
use tracing::{info, warn};

use crate::backend::domain::errors::validated;
use crate::backend::domain::{ensure_parent, find_member, now_timestamp, DomainError};
use crate::backend::storage::{DbConnection, EntryOutcome, NewEntry, TransactionRepository, UserRepository};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Map a ledger write outcome to the recorded entry or a caller-facing error
pub fn recorded(outcome: EntryOutcome) -> Result<Transaction> {
    match outcome {
        EntryOutcome::Recorded(transaction) => Ok(transaction),
        EntryOutcome::InsufficientPoints => Err(DomainError::Conflict("Not enough points".to_string()).into()),
        EntryOutcome::InsufficientMoney => Err(DomainError::Conflict("Not enough money".to_string()).into()),
        EntryOutcome::UserNotFound => Err(DomainError::not_found("User").into()),
        EntryOutcome::ClaimFailed => {
            Err(DomainError::Conflict("This item has already been processed".to_string()).into())
        }
    }
}

/// Service for the points/money ledger
#[derive(Clone)]
pub struct TransactionService {
    transactions: TransactionRepository,
    users: UserRepository,
}

impl TransactionService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            transactions: TransactionRepository::new(db.clone()),
            users: UserRepository::new(db),
        }
    }

    /// List ledger entries newest first. Children and teens only ever see
    /// their own entries whatever `user_id` asks for.
    pub async fn list_transactions(&self, actor: &User, query: TransactionListRequest) -> Result<TransactionListResponse> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let user_id = if actor.is_parent() {
            match &query.user_id {
                Some(user_id) => Some(find_member(&self.users, &actor.household_id, user_id).await?.id),
                None => None,
            }
        } else {
            Some(actor.id.clone())
        };

        if let Some(after) = &query.after {
            if !self.transactions.exists(&actor.household_id, after).await? {
                return Err(DomainError::Validation("after must be the id of a listed transaction".to_string()).into());
            }
        }

        info!(
            "Listing transactions for {} (user={:?}, limit={}, after={:?})",
            actor.household_id, user_id, limit, query.after
        );

        // Fetch one extra to learn whether another page exists
        let mut transactions = self
            .transactions
            .list_transactions(&actor.household_id, user_id.as_deref(), limit + 1, query.after.as_deref())
            .await?;

        let has_more = transactions.len() > limit as usize;
        if has_more {
            transactions.truncate(limit as usize);
        }
        let next_cursor = if has_more { transactions.last().map(|t| t.id.clone()) } else { None };

        Ok(TransactionListResponse {
            transactions,
            pagination: PaginationInfo { has_more, next_cursor },
        })
    }

    /// Record an allowance or manual adjustment
    pub async fn create_adjustment(&self, actor: &User, request: CreateTransactionRequest) -> Result<Transaction> {
        ensure_parent(actor, "record allowances and adjustments")?;
        validated(validate_create_transaction(&request))?;
        let member = find_member(&self.users, &actor.household_id, &request.user_id).await?;

        let entry = NewEntry {
            household_id: actor.household_id.clone(),
            user_id: member.id.clone(),
            kind: request.kind,
            description: request.description.trim().to_string(),
            points: request.points,
            money: request.money,
            related_id: None,
            created_at: now_timestamp(),
        };
        let result = recorded(self.transactions.record_entry(&entry, None).await?);
        if let Err(e) = &result {
            warn!("Adjustment for {} refused: {}", member.id, e);
        }
        result
    }

    pub async fn summary(&self, actor: &User, user_id: &str) -> Result<BalanceSummary> {
        if !actor.is_parent() && actor.id != user_id {
            return Err(DomainError::Forbidden("You can only view your own balance".to_string()).into());
        }
        self.transactions
            .summary(&actor.household_id, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User").into())
    }
}
