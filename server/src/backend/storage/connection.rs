use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// How long a writer waits for another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// DbConnection manages the SQLite pool and schema
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating if needed) the database at `url`
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Private in-memory database, used by tests and throwaway servers.
    /// A single long-lived connection keeps the database alive.
    pub async fn init_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS households (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                household_id TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL CHECK (role IN ('parent', 'teen', 'child')),
                password_hash TEXT NOT NULL,
                password_salt TEXT NOT NULL,
                points_balance INTEGER NOT NULL DEFAULT 0,
                money_balance REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (household_id) REFERENCES households (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_users_household
            ON users(household_id, name);
            "#,
        )
        .execute(pool)
        .await?;

        // Only token hashes are stored
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                access_token_hash TEXT NOT NULL UNIQUE,
                access_expires_at TEXT NOT NULL,
                refresh_token_hash TEXT NOT NULL UNIQUE,
                refresh_expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chores (
                id TEXT PRIMARY KEY,
                household_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                points INTEGER NOT NULL,
                money_reward REAL NOT NULL DEFAULT 0,
                due_date TEXT,
                assignee_id TEXT,
                status TEXT NOT NULL CHECK (status IN ('open', 'completed', 'approved')),
                completed_by TEXT,
                completed_at TEXT,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (household_id) REFERENCES households (id) ON DELETE CASCADE,
                FOREIGN KEY (assignee_id) REFERENCES users (id) ON DELETE SET NULL,
                FOREIGN KEY (completed_by) REFERENCES users (id) ON DELETE SET NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_chores_household
            ON chores(household_id, status);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rewards (
                id TEXT PRIMARY KEY,
                household_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                cost_points INTEGER NOT NULL DEFAULT 0,
                cost_money REAL NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (household_id) REFERENCES households (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                household_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                location TEXT,
                starts_at TEXT NOT NULL,
                ends_at TEXT,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (household_id) REFERENCES households (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                household_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                description TEXT NOT NULL,
                points INTEGER NOT NULL DEFAULT 0,
                money REAL NOT NULL DEFAULT 0,
                points_balance INTEGER NOT NULL,
                money_balance REAL NOT NULL,
                related_id TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (household_id) REFERENCES households (id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_user
            ON transactions(user_id);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS learning_tasks (
                id TEXT PRIMARY KEY,
                household_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                subject TEXT,
                points INTEGER NOT NULL,
                assignee_id TEXT,
                status TEXT NOT NULL CHECK (status IN ('open', 'completed')),
                completed_by TEXT,
                completed_at TEXT,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (household_id) REFERENCES households (id) ON DELETE CASCADE,
                FOREIGN KEY (assignee_id) REFERENCES users (id) ON DELETE SET NULL,
                FOREIGN KEY (completed_by) REFERENCES users (id) ON DELETE SET NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Puzzles handed out to players; each scores at most once
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sudoku_puzzles (
                id TEXT PRIMARY KEY,
                household_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                template INTEGER NOT NULL,
                cells TEXT NOT NULL,
                consumed BOOLEAN NOT NULL DEFAULT FALSE,
                consumed_at TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (household_id) REFERENCES households (id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}
