use anyhow::Result;
use chrono::Utc;
use shared::validation::{validate_create_chore, validate_update_chore};
use shared::{
    ApproveChoreResponse, Chore, ChoreListRequest, ChoreListResponse, ChoreStatus, CreateChoreRequest,
    TransactionKind, UpdateChoreRequest, User,
};
use tracing::{info, warn};

use crate::backend::domain::errors::validated;
use crate::backend::domain::transaction_service::recorded;
use crate::backend::domain::{ensure_assignee, ensure_parent, now_timestamp, DomainError};
use crate::backend::storage::{
    ChoreRepository, DbConnection, EntryOutcome, LedgerClaim, NewEntry, TransactionRepository, UserRepository,
};

/// Service for the chore lifecycle
#[derive(Clone)]
pub struct ChoreService {
    chores: ChoreRepository,
    users: UserRepository,
    transactions: TransactionRepository,
}

impl ChoreService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            chores: ChoreRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            transactions: TransactionRepository::new(db),
        }
    }

    pub async fn list_chores(&self, actor: &User, filter: ChoreListRequest) -> Result<ChoreListResponse> {
        let chores = self.chores.list_chores(&actor.household_id, &filter).await?;
        info!("Found {} chores for {}", chores.len(), actor.household_id);
        Ok(ChoreListResponse { chores })
    }

    pub async fn get_chore(&self, actor: &User, chore_id: &str) -> Result<Chore> {
        self.chores
            .get_chore(&actor.household_id, chore_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Chore").into())
    }

    pub async fn create_chore(&self, actor: &User, request: CreateChoreRequest) -> Result<Chore> {
        ensure_parent(actor, "create chores")?;
        validated(validate_create_chore(&request, Utc::now().date_naive()))?;
        ensure_assignee(&self.users, &actor.household_id, request.assignee_id.as_deref()).await?;

        let now = now_timestamp();
        let chore = Chore {
            id: Chore::generate_id(),
            household_id: actor.household_id.clone(),
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            points: request.points,
            money_reward: request.money_reward,
            due_date: request.due_date.map(|d| d.trim().to_string()),
            assignee_id: request.assignee_id,
            status: ChoreStatus::Open,
            completed_by: None,
            completed_at: None,
            created_by: actor.id.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.chores.store_chore(&chore).await?;

        info!("Created chore '{}' with ID: {}", chore.title, chore.id);
        Ok(chore)
    }

    /// Edit an open chore
    pub async fn update_chore(&self, actor: &User, chore_id: &str, request: UpdateChoreRequest) -> Result<Chore> {
        ensure_parent(actor, "edit chores")?;
        let mut chore = self.get_chore(actor, chore_id).await?;
        if chore.status != ChoreStatus::Open {
            return Err(DomainError::Conflict("Only open chores can be edited".to_string()).into());
        }
        validated(validate_update_chore(&request, Utc::now().date_naive()))?;
        ensure_assignee(&self.users, &actor.household_id, request.assignee_id.as_deref()).await?;

        if let Some(title) = request.title {
            chore.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            chore.description = description.trim().to_string();
        }
        if let Some(points) = request.points {
            chore.points = points;
        }
        if let Some(money_reward) = request.money_reward {
            chore.money_reward = money_reward;
        }
        if request.clear_due_date {
            chore.due_date = None;
        } else if let Some(due_date) = request.due_date {
            chore.due_date = Some(due_date.trim().to_string());
        }
        if request.clear_assignee {
            chore.assignee_id = None;
        } else if request.assignee_id.is_some() {
            chore.assignee_id = request.assignee_id;
        }
        chore.updated_at = now_timestamp();

        self.chores.update_chore(&chore).await?;
        info!("Updated chore {}", chore.id);
        Ok(chore)
    }

    pub async fn delete_chore(&self, actor: &User, chore_id: &str) -> Result<()> {
        ensure_parent(actor, "delete chores")?;
        if !self.chores.delete_chore(&actor.household_id, chore_id).await? {
            return Err(DomainError::not_found("Chore").into());
        }
        info!("Deleted chore {}", chore_id);
        Ok(())
    }

    /// Mark an open chore as done by the caller
    pub async fn complete_chore(&self, actor: &User, chore_id: &str) -> Result<Chore> {
        let chore = self.get_chore(actor, chore_id).await?;
        if chore.status != ChoreStatus::Open {
            return Err(DomainError::Conflict("This chore is not open".to_string()).into());
        }
        if !chore.can_be_completed_by(&actor.id) {
            return Err(DomainError::Forbidden("This chore is assigned to someone else".to_string()).into());
        }

        let now = now_timestamp();
        let moved = self
            .chores
            .transition(
                &chore.id,
                ChoreStatus::Open,
                ChoreStatus::Completed,
                Some(actor.id.as_str()),
                Some(now.as_str()),
                &now,
            )
            .await?;
        if !moved {
            return Err(DomainError::Conflict("This chore is not open".to_string()).into());
        }

        info!("Chore {} completed by {}", chore.id, actor.id);
        self.get_chore(actor, chore_id).await
    }

    /// Approve a completed chore and credit whoever completed it
    pub async fn approve_chore(&self, actor: &User, chore_id: &str) -> Result<ApproveChoreResponse> {
        ensure_parent(actor, "approve chores")?;
        let chore = self.get_chore(actor, chore_id).await?;
        if chore.status != ChoreStatus::Completed {
            return Err(DomainError::Conflict("Only completed chores can be approved".to_string()).into());
        }
        let Some(recipient) = chore.completed_by.clone() else {
            return Err(DomainError::Conflict("The member who completed this chore no longer exists".to_string()).into());
        };

        let entry = NewEntry {
            household_id: actor.household_id.clone(),
            user_id: recipient,
            kind: TransactionKind::ChoreReward,
            description: format!("Chore: {}", chore.title),
            points: chore.points,
            money: chore.money_reward,
            related_id: Some(chore.id.clone()),
            created_at: now_timestamp(),
        };
        let claim = LedgerClaim::ApproveChore { chore_id: chore.id.clone() };

        let transaction = match self.transactions.record_entry(&entry, Some(&claim)).await? {
            EntryOutcome::ClaimFailed => {
                warn!("Chore {} changed while being approved", chore.id);
                return Err(DomainError::Conflict("Only completed chores can be approved".to_string()).into());
            }
            outcome => recorded(outcome)?,
        };

        info!("Approved chore {} for {} points", chore.id, chore.points);
        let chore = self.get_chore(actor, chore_id).await?;
        Ok(ApproveChoreResponse { chore, transaction })
    }

    /// Send a completed chore back to open
    pub async fn reject_chore(&self, actor: &User, chore_id: &str) -> Result<Chore> {
        ensure_parent(actor, "reject chores")?;
        let chore = self.get_chore(actor, chore_id).await?;

        let moved = self
            .chores
            .transition(&chore.id, ChoreStatus::Completed, ChoreStatus::Open, None, None, &now_timestamp())
            .await?;
        if !moved {
            return Err(DomainError::Conflict("Only completed chores can be rejected".to_string()).into());
        }

        info!("Rejected chore {}", chore.id);
        self.get_chore(actor, chore_id).await
    }
}
