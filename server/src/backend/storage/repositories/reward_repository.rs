use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use shared::Reward;
use crate::backend::storage::connection::DbConnection;

/// Repository for reward operations
#[derive(Clone)]
pub struct RewardRepository {
    db: DbConnection,
}

const REWARD_COLUMNS: &str =
    "id, household_id, title, description, cost_points, cost_money, is_active, created_at, updated_at";

fn row_to_reward(row: &SqliteRow) -> Reward {
    Reward {
        id: row.get("id"),
        household_id: row.get("household_id"),
        title: row.get("title"),
        description: row.get("description"),
        cost_points: row.get("cost_points"),
        cost_money: row.get("cost_money"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl RewardRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_reward(&self, reward: &Reward) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rewards (id, household_id, title, description, cost_points, cost_money,
                                 is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reward.id)
        .bind(&reward.household_id)
        .bind(&reward.title)
        .bind(&reward.description)
        .bind(reward.cost_points)
        .bind(reward.cost_money)
        .bind(reward.is_active)
        .bind(&reward.created_at)
        .bind(&reward.updated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_reward(&self, household_id: &str, reward_id: &str) -> Result<Option<Reward>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM rewards WHERE id = ? AND household_id = ?",
            REWARD_COLUMNS
        ))
        .bind(reward_id)
        .bind(household_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(row_to_reward))
    }

    /// List rewards, cheapest first
    pub async fn list_rewards(&self, household_id: &str, include_inactive: bool) -> Result<Vec<Reward>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM rewards
            WHERE household_id = ? AND (? OR is_active)
            ORDER BY cost_points ASC, cost_money ASC, title ASC
            "#,
            REWARD_COLUMNS
        ))
        .bind(household_id)
        .bind(include_inactive)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(row_to_reward).collect())
    }

    pub async fn update_reward(&self, reward: &Reward) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE rewards
            SET title = ?, description = ?, cost_points = ?, cost_money = ?, is_active = ?, updated_at = ?
            WHERE id = ? AND household_id = ?
            "#,
        )
        .bind(&reward.title)
        .bind(&reward.description)
        .bind(reward.cost_points)
        .bind(reward.cost_money)
        .bind(reward.is_active)
        .bind(&reward.updated_at)
        .bind(&reward.id)
        .bind(&reward.household_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_reward(&self, household_id: &str, reward_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rewards WHERE id = ? AND household_id = ?")
            .bind(reward_id)
            .bind(household_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
