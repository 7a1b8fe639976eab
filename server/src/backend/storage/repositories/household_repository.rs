use anyhow::Result;
use sqlx::Row;
use shared::Household;
use crate::backend::storage::connection::DbConnection;

/// Repository for household operations
#[derive(Clone)]
pub struct HouseholdRepository {
    db: DbConnection,
}

impl HouseholdRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_household(&self, household: &Household) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO households (id, name, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&household.id)
        .bind(&household.name)
        .bind(&household.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_household(&self, household_id: &str) -> Result<Option<Household>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, created_at
            FROM households
            WHERE id = ?
            "#,
        )
        .bind(household_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| Household {
            id: r.get("id"),
            name: r.get("name"),
            created_at: r.get("created_at"),
        }))
    }

    pub async fn delete_household(&self, household_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM households WHERE id = ?")
            .bind(household_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_get_delete_household() {
        let db = DbConnection::init_in_memory().await.expect("Failed to create test database");
        let repo = HouseholdRepository::new(db);

        let household = Household {
            id: Household::generate_id(),
            name: "The Parkers".to_string(),
            created_at: "2025-06-01T10:00:00+00:00".to_string(),
        };
        repo.store_household(&household).await.unwrap();

        let loaded = repo.get_household(&household.id).await.unwrap();
        assert_eq!(loaded, Some(household.clone()));

        assert!(repo.delete_household(&household.id).await.unwrap());
        assert!(!repo.delete_household(&household.id).await.unwrap());
        assert!(repo.get_household(&household.id).await.unwrap().is_none());
    }
}
