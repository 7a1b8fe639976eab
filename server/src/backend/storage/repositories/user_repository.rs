use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use shared::{Role, User};
use crate::backend::storage::connection::DbConnection;

/// Salted password hash stored alongside a user
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub password_hash: String,
    pub password_salt: String,
}

/// Repository for user operations
#[derive(Clone)]
pub struct UserRepository {
    db: DbConnection,
}

const USER_COLUMNS: &str =
    "id, household_id, name, email, role, points_balance, money_balance, created_at, updated_at";

pub(crate) fn row_to_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        household_id: row.get("household_id"),
        name: row.get("name"),
        email: row.get("email"),
        role: row.get::<String, _>("role").parse::<Role>()?,
        points_balance: row.get("points_balance"),
        money_balance: row.get("money_balance"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl UserRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Store a new user together with their credentials
    pub async fn store_user(&self, user: &User, credentials: &Credentials) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, household_id, name, email, role, password_hash, password_salt,
                               points_balance, money_balance, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.household_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&credentials.password_hash)
        .bind(&credentials.password_salt)
        .bind(user.points_balance)
        .bind(user.money_balance)
        .bind(&user.created_at)
        .bind(&user.updated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Look up a user and their credentials by email (case-insensitive)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<(User, Credentials)>> {
        let row = sqlx::query(&format!(
            "SELECT {}, password_hash, password_salt FROM users WHERE email = ? COLLATE NOCASE",
            USER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => {
                let user = row_to_user(&r)?;
                let credentials = Credentials {
                    password_hash: r.get("password_hash"),
                    password_salt: r.get("password_salt"),
                };
                Ok(Some((user, credentials)))
            }
            None => Ok(None),
        }
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email.trim())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.is_some())
    }

    /// List members of a household ordered by name
    pub async fn list_household_users(&self, household_id: &str) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE household_id = ? ORDER BY name ASC, created_at ASC",
            USER_COLUMNS
        ))
        .bind(household_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    pub async fn count_parents(&self, household_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE household_id = ? AND role = 'parent'")
            .bind(household_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.get("n"))
    }

    /// Update profile fields; balances are only ever changed by the ledger
    pub async fn update_profile(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = ?, role = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.updated_at)
        .bind(&user.id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn update_credentials(&self, user_id: &str, credentials: &Credentials, updated_at: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?, password_salt = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&credentials.password_hash)
        .bind(&credentials.password_salt)
        .bind(updated_at)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
