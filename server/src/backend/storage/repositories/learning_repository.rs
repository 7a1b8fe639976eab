use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use shared::{LearningStatus, LearningTask, SudokuPuzzle};
use crate::backend::storage::connection::DbConnection;

/// A Sudoku puzzle as issued to one player
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedPuzzle {
    pub puzzle: SudokuPuzzle,
    pub consumed: bool,
}

/// Repository for learning tasks and issued Sudoku puzzles
#[derive(Clone)]
pub struct LearningRepository {
    db: DbConnection,
}

const TASK_COLUMNS: &str = "id, household_id, title, description, subject, points, assignee_id, status, \
    completed_by, completed_at, created_by, created_at, updated_at";

fn row_to_task(row: &SqliteRow) -> Result<LearningTask> {
    Ok(LearningTask {
        id: row.get("id"),
        household_id: row.get("household_id"),
        title: row.get("title"),
        description: row.get("description"),
        subject: row.get("subject"),
        points: row.get("points"),
        assignee_id: row.get("assignee_id"),
        status: row.get::<String, _>("status").parse::<LearningStatus>()?,
        completed_by: row.get("completed_by"),
        completed_at: row.get("completed_at"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl LearningRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_task(&self, task: &LearningTask) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO learning_tasks (id, household_id, title, description, subject, points, assignee_id,
                                        status, completed_by, completed_at, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.household_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.subject)
        .bind(task.points)
        .bind(&task.assignee_id)
        .bind(task.status.as_str())
        .bind(&task.completed_by)
        .bind(&task.completed_at)
        .bind(&task.created_by)
        .bind(&task.created_at)
        .bind(&task.updated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_task(&self, household_id: &str, task_id: &str) -> Result<Option<LearningTask>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM learning_tasks WHERE id = ? AND household_id = ?",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(household_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_task).transpose()
    }

    /// Open tasks first, then by title
    pub async fn list_tasks(&self, household_id: &str) -> Result<Vec<LearningTask>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM learning_tasks
            WHERE household_id = ?
            ORDER BY status = 'completed', title ASC
            "#,
            TASK_COLUMNS
        ))
        .bind(household_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(row_to_task).collect()
    }

    pub async fn update_task(&self, task: &LearningTask) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE learning_tasks
            SET title = ?, description = ?, subject = ?, points = ?, assignee_id = ?, updated_at = ?
            WHERE id = ? AND household_id = ?
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.subject)
        .bind(task.points)
        .bind(&task.assignee_id)
        .bind(&task.updated_at)
        .bind(&task.id)
        .bind(&task.household_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_task(&self, household_id: &str, task_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM learning_tasks WHERE id = ? AND household_id = ?")
            .bind(task_id)
            .bind(household_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn store_puzzle(
        &self,
        household_id: &str,
        user_id: &str,
        puzzle: &SudokuPuzzle,
        created_at: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sudoku_puzzles (id, household_id, user_id, template, cells, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&puzzle.id)
        .bind(household_id)
        .bind(user_id)
        .bind(puzzle.template as i64)
        .bind(serde_json::to_string(&puzzle.cells)?)
        .bind(created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// A puzzle issued to `user_id`; puzzles of other players read as missing
    pub async fn get_puzzle(&self, household_id: &str, user_id: &str, puzzle_id: &str) -> Result<Option<IssuedPuzzle>> {
        let row = sqlx::query(
            r#"
            SELECT id, template, cells, consumed
            FROM sudoku_puzzles
            WHERE id = ? AND household_id = ? AND user_id = ?
            "#,
        )
        .bind(puzzle_id)
        .bind(household_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let puzzle = SudokuPuzzle {
            id: row.get("id"),
            template: u8::try_from(row.get::<i64, _>("template"))?,
            cells: serde_json::from_str(&row.get::<String, _>("cells"))?,
        };
        Ok(Some(IssuedPuzzle { puzzle, consumed: row.get("consumed") }))
    }
}
