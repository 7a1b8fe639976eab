use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use shared::{Chore, ChoreListRequest, ChoreStatus};
use crate::backend::storage::connection::DbConnection;

/// Repository for chore operations
#[derive(Clone)]
pub struct ChoreRepository {
    db: DbConnection,
}

const CHORE_COLUMNS: &str = "id, household_id, title, description, points, money_reward, due_date, \
    assignee_id, status, completed_by, completed_at, created_by, created_at, updated_at";

fn row_to_chore(row: &SqliteRow) -> Result<Chore> {
    Ok(Chore {
        id: row.get("id"),
        household_id: row.get("household_id"),
        title: row.get("title"),
        description: row.get("description"),
        points: row.get("points"),
        money_reward: row.get("money_reward"),
        due_date: row.get("due_date"),
        assignee_id: row.get("assignee_id"),
        status: row.get::<String, _>("status").parse::<ChoreStatus>()?,
        completed_by: row.get("completed_by"),
        completed_at: row.get("completed_at"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl ChoreRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_chore(&self, chore: &Chore) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chores (id, household_id, title, description, points, money_reward, due_date,
                                assignee_id, status, completed_by, completed_at, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chore.id)
        .bind(&chore.household_id)
        .bind(&chore.title)
        .bind(&chore.description)
        .bind(chore.points)
        .bind(chore.money_reward)
        .bind(&chore.due_date)
        .bind(&chore.assignee_id)
        .bind(chore.status.as_str())
        .bind(&chore.completed_by)
        .bind(&chore.completed_at)
        .bind(&chore.created_by)
        .bind(&chore.created_at)
        .bind(&chore.updated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get a chore within a household
    pub async fn get_chore(&self, household_id: &str, chore_id: &str) -> Result<Option<Chore>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM chores WHERE id = ? AND household_id = ?",
            CHORE_COLUMNS
        ))
        .bind(chore_id)
        .bind(household_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_chore).transpose()
    }

    /// List chores ordered by due date (undated last), then title
    pub async fn list_chores(&self, household_id: &str, filter: &ChoreListRequest) -> Result<Vec<Chore>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM chores
            WHERE household_id = ?
              AND (? IS NULL OR status = ?)
              AND (? IS NULL OR assignee_id = ?)
            ORDER BY due_date IS NULL, due_date ASC, title ASC
            "#,
            CHORE_COLUMNS
        ))
        .bind(household_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(&filter.assignee_id)
        .bind(&filter.assignee_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(row_to_chore).collect()
    }

    /// Overwrite the editable fields and status of a chore
    pub async fn update_chore(&self, chore: &Chore) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE chores
            SET title = ?, description = ?, points = ?, money_reward = ?, due_date = ?, assignee_id = ?,
                status = ?, completed_by = ?, completed_at = ?, updated_at = ?
            WHERE id = ? AND household_id = ?
            "#,
        )
        .bind(&chore.title)
        .bind(&chore.description)
        .bind(chore.points)
        .bind(chore.money_reward)
        .bind(&chore.due_date)
        .bind(&chore.assignee_id)
        .bind(chore.status.as_str())
        .bind(&chore.completed_by)
        .bind(&chore.completed_at)
        .bind(&chore.updated_at)
        .bind(&chore.id)
        .bind(&chore.household_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Move a chore between states only if it is still in `from`.
    /// Returns false when another request changed it first.
    pub async fn transition(
        &self,
        chore_id: &str,
        from: ChoreStatus,
        to: ChoreStatus,
        completed_by: Option<&str>,
        completed_at: Option<&str>,
        updated_at: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chores
            SET status = ?, completed_by = ?, completed_at = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(completed_by)
        .bind(completed_at)
        .bind(updated_at)
        .bind(chore_id)
        .bind(from.as_str())
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_chore(&self, household_id: &str, chore_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chores WHERE id = ? AND household_id = ?")
            .bind(chore_id)
            .bind(household_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
