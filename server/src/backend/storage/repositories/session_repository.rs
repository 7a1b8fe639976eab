use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use crate::backend::storage::connection::DbConnection;

/// A login session; tokens are stored only as hashes
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub access_token_hash: String,
    pub access_expires_at: String,
    pub refresh_token_hash: String,
    pub refresh_expires_at: String,
    pub created_at: String,
}

/// Repository for session operations
#[derive(Clone)]
pub struct SessionRepository {
    db: DbConnection,
}

const SESSION_COLUMNS: &str =
    "id, user_id, access_token_hash, access_expires_at, refresh_token_hash, refresh_expires_at, created_at";

fn row_to_session(row: &SqliteRow) -> Session {
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        access_token_hash: row.get("access_token_hash"),
        access_expires_at: row.get("access_expires_at"),
        refresh_token_hash: row.get("refresh_token_hash"),
        refresh_expires_at: row.get("refresh_expires_at"),
        created_at: row.get("created_at"),
    }
}

impl SessionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, access_token_hash, access_expires_at,
                                  refresh_token_hash, refresh_expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.access_token_hash)
        .bind(&session.access_expires_at)
        .bind(&session.refresh_token_hash)
        .bind(&session.refresh_expires_at)
        .bind(&session.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_by_access_hash(&self, access_token_hash: &str) -> Result<Option<Session>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM sessions WHERE access_token_hash = ?",
            SESSION_COLUMNS
        ))
        .bind(access_token_hash)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(row_to_session))
    }

    pub async fn find_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<Option<Session>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM sessions WHERE refresh_token_hash = ?",
            SESSION_COLUMNS
        ))
        .bind(refresh_token_hash)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(row_to_session))
    }

    /// Returns true if the session existed
    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sign a user out everywhere, e.g. after a password change
    pub async fn delete_user_sessions(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Drop sessions whose refresh token expired before `now` (RFC 3339)
    pub async fn delete_expired(&self, now: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE refresh_expires_at < ?")
            .bind(now)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
