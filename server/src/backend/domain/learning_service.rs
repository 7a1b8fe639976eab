use anyhow::Result;
use shared::sudoku::score;
use shared::validation::{validate_create_learning_task, validate_update_learning_task};
use shared::{
    CompleteLearningTaskResponse, CreateLearningTaskRequest, LearningStatus, LearningTask, LearningTaskListResponse,
    SudokuPuzzle, SudokuResult, SudokuSubmission, TransactionKind, UpdateLearningTaskRequest, User,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::domain::errors::validated;
use crate::backend::domain::transaction_service::recorded;
use crate::backend::domain::{ensure_assignee, ensure_parent, now_timestamp, DomainError};
use crate::backend::storage::{
    DbConnection, EntryOutcome, LearningRepository, LedgerClaim, NewEntry, TransactionRepository, UserRepository,
};

const ALREADY_SCORED: &str = "This puzzle has already been scored";

/// Service for learning tasks and the Sudoku mini-game
#[derive(Clone)]
pub struct LearningService {
    tasks: LearningRepository,
    users: UserRepository,
    transactions: TransactionRepository,
}

impl LearningService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            tasks: LearningRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            transactions: TransactionRepository::new(db),
        }
    }

    pub async fn list_tasks(&self, actor: &User) -> Result<LearningTaskListResponse> {
        let tasks = self.tasks.list_tasks(&actor.household_id).await?;
        info!("Found {} learning tasks for {}", tasks.len(), actor.household_id);
        Ok(LearningTaskListResponse { tasks })
    }

    pub async fn get_task(&self, actor: &User, task_id: &str) -> Result<LearningTask> {
        self.tasks
            .get_task(&actor.household_id, task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Learning task").into())
    }

    pub async fn create_task(&self, actor: &User, request: CreateLearningTaskRequest) -> Result<LearningTask> {
        ensure_parent(actor, "create learning tasks")?;
        validated(validate_create_learning_task(&request))?;
        ensure_assignee(&self.users, &actor.household_id, request.assignee_id.as_deref()).await?;

        let now = now_timestamp();
        let task = LearningTask {
            id: LearningTask::generate_id(),
            household_id: actor.household_id.clone(),
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            subject: request.subject.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            points: request.points,
            assignee_id: request.assignee_id,
            status: LearningStatus::Open,
            completed_by: None,
            completed_at: None,
            created_by: actor.id.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.tasks.store_task(&task).await?;

        info!("Created learning task '{}' with ID: {}", task.title, task.id);
        Ok(task)
    }

    pub async fn update_task(
        &self,
        actor: &User,
        task_id: &str,
        request: UpdateLearningTaskRequest,
    ) -> Result<LearningTask> {
        ensure_parent(actor, "edit learning tasks")?;
        let mut task = self.get_task(actor, task_id).await?;
        if task.status != LearningStatus::Open {
            return Err(DomainError::Conflict("Completed learning tasks cannot be edited".to_string()).into());
        }
        validated(validate_update_learning_task(&request))?;
        ensure_assignee(&self.users, &actor.household_id, request.assignee_id.as_deref()).await?;

        if let Some(title) = request.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            task.description = description.trim().to_string();
        }
        if let Some(subject) = request.subject {
            task.subject = Some(subject.trim().to_string()).filter(|s| !s.is_empty());
        }
        if let Some(points) = request.points {
            task.points = points;
        }
        if request.clear_assignee {
            task.assignee_id = None;
        } else if request.assignee_id.is_some() {
            task.assignee_id = request.assignee_id;
        }
        task.updated_at = now_timestamp();

        self.tasks.update_task(&task).await?;
        info!("Updated learning task {}", task.id);
        Ok(task)
    }

    pub async fn delete_task(&self, actor: &User, task_id: &str) -> Result<()> {
        ensure_parent(actor, "delete learning tasks")?;
        if !self.tasks.delete_task(&actor.household_id, task_id).await? {
            return Err(DomainError::not_found("Learning task").into());
        }
        info!("Deleted learning task {}", task_id);
        Ok(())
    }

    /// Complete a task and credit its points to the caller
    pub async fn complete_task(&self, actor: &User, task_id: &str) -> Result<CompleteLearningTaskResponse> {
        let task = self.get_task(actor, task_id).await?;
        if task.status != LearningStatus::Open {
            return Err(DomainError::Conflict("This learning task is already completed".to_string()).into());
        }
        if !task.can_be_completed_by(&actor.id) {
            return Err(DomainError::Forbidden("This learning task is assigned to someone else".to_string()).into());
        }

        let entry = NewEntry {
            household_id: actor.household_id.clone(),
            user_id: actor.id.clone(),
            kind: TransactionKind::LearningReward,
            description: format!("Learning: {}", task.title),
            points: task.points,
            money: 0.0,
            related_id: Some(task.id.clone()),
            created_at: now_timestamp(),
        };
        let claim = LedgerClaim::CompleteLearningTask { task_id: task.id.clone(), completed_by: actor.id.clone() };

        let transaction = match self.transactions.record_entry(&entry, Some(&claim)).await? {
            EntryOutcome::ClaimFailed => {
                return Err(DomainError::Conflict("This learning task is already completed".to_string()).into());
            }
            outcome => recorded(outcome)?,
        };

        info!("Learning task {} completed by {}", task.id, actor.id);
        let task = self.get_task(actor, task_id).await?;
        Ok(CompleteLearningTaskResponse { task, transaction })
    }

    /// Issue a fresh puzzle to `actor`; only issued puzzles can be scored
    pub async fn new_puzzle(&self, actor: &User) -> Result<SudokuPuzzle> {
        let puzzle = SudokuPuzzle::generate(SudokuPuzzle::generate_id(), Uuid::new_v4().as_u128() as u64);
        self.tasks
            .store_puzzle(&actor.household_id, &actor.id, &puzzle, &now_timestamp())
            .await?;

        info!("Issued Sudoku {} to {}", puzzle.id, actor.id);
        Ok(puzzle)
    }

    /// Verify a solved puzzle and credit its score as points, once per puzzle
    pub async fn submit_sudoku(&self, actor: &User, submission: SudokuSubmission) -> Result<SudokuResult> {
        let Some(issued) = self
            .tasks
            .get_puzzle(&actor.household_id, &actor.id, &submission.puzzle_id)
            .await?
        else {
            warn!("{} submitted Sudoku {} which was not issued to them", actor.id, submission.puzzle_id);
            return Err(DomainError::not_found("Sudoku puzzle").into());
        };
        if issued.consumed {
            return Err(DomainError::Conflict(ALREADY_SCORED.to_string()).into());
        }
        let puzzle = issued.puzzle;
        if !puzzle.is_solved_by(&submission.grid) {
            return Err(DomainError::Validation("grid does not solve the puzzle".to_string()).into());
        }

        let score = score(puzzle.blanks(), submission.mistakes);
        let entry = NewEntry {
            household_id: actor.household_id.clone(),
            user_id: actor.id.clone(),
            kind: TransactionKind::LearningReward,
            description: "Sudoku".to_string(),
            points: score as i64,
            money: 0.0,
            related_id: Some(puzzle.id.clone()),
            created_at: now_timestamp(),
        };
        let claim = LedgerClaim::ConsumeSudoku { puzzle_id: puzzle.id.clone(), user_id: actor.id.clone() };

        let transaction = match self.transactions.record_entry(&entry, Some(&claim)).await? {
            EntryOutcome::ClaimFailed => return Err(DomainError::Conflict(ALREADY_SCORED.to_string()).into()),
            outcome => recorded(outcome)?,
        };

        info!("{} solved Sudoku {} for {} points", actor.id, puzzle.id, score);
        Ok(SudokuResult { score, transaction })
    }
}
