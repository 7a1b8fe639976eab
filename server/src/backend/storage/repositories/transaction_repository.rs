use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use shared::format::round_cents;
use shared::{BalanceSummary, Transaction, TransactionKind};
use tracing::{debug, info};
use crate::backend::storage::connection::DbConnection;

/// A ledger entry to be recorded; balances are computed by the repository
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub household_id: String,
    pub user_id: String,
    pub kind: TransactionKind,
    pub description: String,
    pub points: i64,
    pub money: f64,
    pub related_id: Option<String>,
    pub created_at: String,
}

/// A state change that must commit together with a ledger entry
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerClaim {
    /// Completed -> Approved
    ApproveChore { chore_id: String },
    /// Open -> Completed
    CompleteLearningTask { task_id: String, completed_by: String },
    /// Issued Sudoku puzzle -> scored, for the player it was issued to
    ConsumeSudoku { puzzle_id: String, user_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Recorded(Transaction),
    UserNotFound,
    InsufficientPoints,
    InsufficientMoney,
    /// The claimed record was no longer in the expected state
    ClaimFailed,
}

/// Repository for the points/money ledger
#[derive(Clone)]
pub struct TransactionRepository {
    db: DbConnection,
}

const TRANSACTION_COLUMNS: &str = "id, household_id, user_id, kind, description, points, money, \
    points_balance, money_balance, related_id, created_at";

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    Ok(Transaction {
        id: row.get("id"),
        household_id: row.get("household_id"),
        user_id: row.get("user_id"),
        kind: row.get::<String, _>("kind").parse::<TransactionKind>()?,
        description: row.get("description"),
        points: row.get("points"),
        money: row.get("money"),
        points_balance: row.get("points_balance"),
        money_balance: row.get("money_balance"),
        related_id: row.get("related_id"),
        created_at: row.get("created_at"),
    })
}

impl TransactionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Record a ledger entry and move the user's balances in one database
    /// transaction. Nothing is written unless every step succeeds.
    pub async fn record_entry(&self, entry: &NewEntry, claim: Option<&LedgerClaim>) -> Result<EntryOutcome> {
        let mut tx = self.db.pool().begin().await?;

        if let Some(claim) = claim {
            let result = match claim {
                LedgerClaim::ApproveChore { chore_id } => {
                    sqlx::query(
                        r#"
                        UPDATE chores
                        SET status = 'approved', updated_at = ?
                        WHERE id = ? AND household_id = ? AND status = 'completed'
                        "#,
                    )
                    .bind(&entry.created_at)
                    .bind(chore_id)
                    .bind(&entry.household_id)
                    .execute(&mut *tx)
                    .await?
                }
                LedgerClaim::CompleteLearningTask { task_id, completed_by } => {
                    sqlx::query(
                        r#"
                        UPDATE learning_tasks
                        SET status = 'completed', completed_by = ?, completed_at = ?, updated_at = ?
                        WHERE id = ? AND household_id = ? AND status = 'open'
                        "#,
                    )
                    .bind(completed_by)
                    .bind(&entry.created_at)
                    .bind(&entry.created_at)
                    .bind(task_id)
                    .bind(&entry.household_id)
                    .execute(&mut *tx)
                    .await?
                }
                LedgerClaim::ConsumeSudoku { puzzle_id, user_id } => {
                    sqlx::query(
                        r#"
                        UPDATE sudoku_puzzles
                        SET consumed = TRUE, consumed_at = ?
                        WHERE id = ? AND household_id = ? AND user_id = ? AND consumed = FALSE
                        "#,
                    )
                    .bind(&entry.created_at)
                    .bind(puzzle_id)
                    .bind(&entry.household_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?
                }
            };
            if result.rows_affected() != 1 {
                tx.rollback().await?;
                debug!("Ledger claim {:?} no longer applies", claim);
                return Ok(EntryOutcome::ClaimFailed);
            }
        }

        // Write before reading: the balance check lives in the UPDATE so the
        // transaction holds the write lock from its first statement.
        let money = round_cents(entry.money);
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET points_balance = points_balance + ?,
                money_balance = round(money_balance + ?, 2),
                updated_at = ?
            WHERE id = ? AND household_id = ?
              AND points_balance + ? >= 0
              AND round(money_balance + ?, 2) >= 0
            RETURNING points_balance, money_balance
            "#,
        )
        .bind(entry.points)
        .bind(money)
        .bind(&entry.created_at)
        .bind(&entry.user_id)
        .bind(&entry.household_id)
        .bind(entry.points)
        .bind(money)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            let current = sqlx::query("SELECT points_balance FROM users WHERE id = ? AND household_id = ?")
                .bind(&entry.user_id)
                .bind(&entry.household_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;

            return Ok(match current {
                None => EntryOutcome::UserNotFound,
                Some(row) if row.get::<i64, _>("points_balance") + entry.points < 0 => EntryOutcome::InsufficientPoints,
                Some(_) => EntryOutcome::InsufficientMoney,
            });
        };

        let points_balance: i64 = row.get("points_balance");
        let money_balance: f64 = row.get("money_balance");

        let transaction = Transaction {
            id: Transaction::generate_id(),
            household_id: entry.household_id.clone(),
            user_id: entry.user_id.clone(),
            kind: entry.kind,
            description: entry.description.clone(),
            points: entry.points,
            money,
            points_balance,
            money_balance,
            related_id: entry.related_id.clone(),
            created_at: entry.created_at.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO transactions (id, household_id, user_id, kind, description, points, money,
                                      points_balance, money_balance, related_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.household_id)
        .bind(&transaction.user_id)
        .bind(transaction.kind.as_str())
        .bind(&transaction.description)
        .bind(transaction.points)
        .bind(transaction.money)
        .bind(transaction.points_balance)
        .bind(transaction.money_balance)
        .bind(&transaction.related_id)
        .bind(&transaction.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Recorded {} for {}: {} points, {} money",
            transaction.kind.as_str(),
            transaction.user_id,
            transaction.points,
            transaction.money
        );
        Ok(EntryOutcome::Recorded(transaction))
    }

    /// Whether `transaction_id` names an entry of the household
    pub async fn exists(&self, household_id: &str, transaction_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM transactions WHERE id = ? AND household_id = ?")
            .bind(transaction_id)
            .bind(household_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.is_some())
    }

    /// List entries newest first, optionally for one user and starting
    /// after the entry with id `after`.
    pub async fn list_transactions(
        &self,
        household_id: &str,
        user_id: Option<&str>,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE household_id = ?
              AND (? IS NULL OR user_id = ?)
              AND (? IS NULL OR rowid < (SELECT rowid FROM transactions WHERE id = ?))
            ORDER BY rowid DESC
            LIMIT ?
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(household_id)
        .bind(user_id)
        .bind(user_id)
        .bind(after)
        .bind(after)
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }

    /// Balances and lifetime points totals of a household member
    pub async fn summary(&self, household_id: &str, user_id: &str) -> Result<Option<BalanceSummary>> {
        let row = sqlx::query(
            r#"
            SELECT u.points_balance,
                   u.money_balance,
                   COALESCE(SUM(CASE WHEN t.points > 0 THEN t.points ELSE 0 END), 0) AS points_earned,
                   COALESCE(SUM(CASE WHEN t.points < 0 THEN -t.points ELSE 0 END), 0) AS points_spent
            FROM users u
            LEFT JOIN transactions t ON t.user_id = u.id
            WHERE u.id = ? AND u.household_id = ?
            GROUP BY u.id
            "#,
        )
        .bind(user_id)
        .bind(household_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| BalanceSummary {
            user_id: user_id.to_string(),
            points_balance: r.get("points_balance"),
            money_balance: r.get("money_balance"),
            points_earned: r.get("points_earned"),
            points_spent: r.get("points_spent"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::repositories::{ChoreRepository, UserRepository};
    use crate::backend::storage::test_utils::{seed_household, seed_user};
    use shared::{Chore, ChoreStatus, Role};

    fn entry(household_id: &str, user_id: &str, kind: TransactionKind, points: i64, money: f64) -> NewEntry {
        NewEntry {
            household_id: household_id.to_string(),
            user_id: user_id.to_string(),
            kind,
            description: format!("{} entry", kind.as_str()),
            points,
            money,
            related_id: None,
            created_at: "2025-06-01T10:00:00.000Z".to_string(),
        }
    }

    fn recorded(outcome: EntryOutcome) -> Transaction {
        match outcome {
            EntryOutcome::Recorded(t) => t,
            other => panic!("expected a recorded entry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_record_entry_updates_balances() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let household = seed_household(&db).await;
        let kid = seed_user(&db, &household.id, "Sam", Role::Child).await;
        let repo = TransactionRepository::new(db.clone());

        let first = recorded(
            repo.record_entry(&entry(&household.id, &kid.id, TransactionKind::Allowance, 30, 5.1), None)
                .await
                .unwrap(),
        );
        assert_eq!(first.points_balance, 30);
        assert_eq!(first.money_balance, 5.1);

        let second = recorded(
            repo.record_entry(&entry(&household.id, &kid.id, TransactionKind::Adjustment, -10, -0.2), None)
                .await
                .unwrap(),
        );
        assert_eq!(second.points_balance, 20);
        assert_eq!(second.money_balance, 4.9);

        let user = UserRepository::new(db).get_user(&kid.id).await.unwrap().unwrap();
        assert_eq!(user.points_balance, 20);
        assert_eq!(user.money_balance, 4.9);
    }

    #[tokio::test]
    async fn test_record_entry_rejects_negative_balances() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let household = seed_household(&db).await;
        let kid = seed_user(&db, &household.id, "Sam", Role::Child).await;
        let repo = TransactionRepository::new(db.clone());

        let outcome = repo
            .record_entry(&entry(&household.id, &kid.id, TransactionKind::RewardRedemption, -1, 0.0), None)
            .await
            .unwrap();
        assert_eq!(outcome, EntryOutcome::InsufficientPoints);

        let outcome = repo
            .record_entry(&entry(&household.id, &kid.id, TransactionKind::RewardRedemption, 0, -0.01), None)
            .await
            .unwrap();
        assert_eq!(outcome, EntryOutcome::InsufficientMoney);

        assert!(repo.list_transactions(&household.id, None, 10, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_entry_for_unknown_or_foreign_user() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let household = seed_household(&db).await;
        let other = seed_household(&db).await;
        let stranger = seed_user(&db, &other.id, "Lee", Role::Child).await;
        let repo = TransactionRepository::new(db);

        let outcome = repo
            .record_entry(&entry(&household.id, &stranger.id, TransactionKind::Allowance, 5, 0.0), None)
            .await
            .unwrap();
        assert_eq!(outcome, EntryOutcome::UserNotFound);
    }

    #[tokio::test]
    async fn test_chore_claim_commits_with_entry_once() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let household = seed_household(&db).await;
        let parent = seed_user(&db, &household.id, "Robin", Role::Parent).await;
        let kid = seed_user(&db, &household.id, "Sam", Role::Child).await;
        let chores = ChoreRepository::new(db.clone());
        let repo = TransactionRepository::new(db);

        let chore = Chore {
            id: Chore::generate_id(),
            household_id: household.id.clone(),
            title: "Bins".to_string(),
            description: String::new(),
            points: 15,
            money_reward: 1.0,
            due_date: None,
            assignee_id: None,
            status: ChoreStatus::Completed,
            completed_by: Some(kid.id.clone()),
            completed_at: Some("2025-06-01T09:00:00.000Z".to_string()),
            created_by: parent.id.clone(),
            created_at: "2025-06-01T08:00:00.000Z".to_string(),
            updated_at: "2025-06-01T09:00:00.000Z".to_string(),
        };
        chores.store_chore(&chore).await.unwrap();

        let claim = LedgerClaim::ApproveChore { chore_id: chore.id.clone() };
        let reward = entry(&household.id, &kid.id, TransactionKind::ChoreReward, 15, 1.0);

        let first = repo.record_entry(&reward, Some(&claim)).await.unwrap();
        assert!(matches!(first, EntryOutcome::Recorded(_)));
        let second = repo.record_entry(&reward, Some(&claim)).await.unwrap();
        assert_eq!(second, EntryOutcome::ClaimFailed);

        let stored = chores.get_chore(&household.id, &chore.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ChoreStatus::Approved);
        assert_eq!(repo.list_transactions(&household.id, None, 10, None).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_entries_on_file_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("ledger.db").display());
        let db = DbConnection::new(&url).await.unwrap();
        let household = seed_household(&db).await;
        let kid = seed_user(&db, &household.id, "Sam", Role::Child).await;
        let repo = TransactionRepository::new(db.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                let entry = entry(&household.id, &kid.id, TransactionKind::Allowance, 1, 0.25);
                tokio::spawn(async move { repo.record_entry(&entry, None).await })
            })
            .collect();

        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert!(matches!(outcome, EntryOutcome::Recorded(_)), "{:?}", outcome);
        }

        let user = UserRepository::new(db).get_user(&kid.id).await.unwrap().unwrap();
        assert_eq!(user.points_balance, 8);
        assert_eq!(user.money_balance, 2.0);

        let mut balances: Vec<i64> = repo
            .list_transactions(&household.id, None, 20, None)
            .await
            .unwrap()
            .iter()
            .map(|t| t.points_balance)
            .collect();
        balances.sort();
        assert_eq!(balances, (1..=8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_list_transactions_newest_first_with_cursor() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let household = seed_household(&db).await;
        let kid = seed_user(&db, &household.id, "Sam", Role::Child).await;
        let sibling = seed_user(&db, &household.id, "Ari", Role::Teen).await;
        let repo = TransactionRepository::new(db);

        let mut ids = Vec::new();
        for points in [1, 2, 3] {
            let t = recorded(
                repo.record_entry(&entry(&household.id, &kid.id, TransactionKind::Allowance, points, 0.0), None)
                    .await
                    .unwrap(),
            );
            ids.push(t.id);
        }
        repo.record_entry(&entry(&household.id, &sibling.id, TransactionKind::Allowance, 9, 0.0), None)
            .await
            .unwrap();

        let page = repo.list_transactions(&household.id, Some(&kid.id), 2, None).await.unwrap();
        let points: Vec<i64> = page.iter().map(|t| t.points).collect();
        assert_eq!(points, vec![3, 2]);

        let rest = repo
            .list_transactions(&household.id, Some(&kid.id), 2, Some(&page[1].id))
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, ids[0]);

        assert_eq!(repo.list_transactions(&household.id, None, 10, None).await.unwrap().len(), 4);
        assert!(repo.exists(&household.id, &ids[0]).await.unwrap());
    }

    #[tokio::test]
    async fn test_summary_totals() {
        let db = DbConnection::init_in_memory().await.unwrap();
        let household = seed_household(&db).await;
        let kid = seed_user(&db, &household.id, "Sam", Role::Child).await;
        let repo = TransactionRepository::new(db);

        let empty = repo.summary(&household.id, &kid.id).await.unwrap().unwrap();
        assert_eq!(empty.points_earned, 0);

        repo.record_entry(&entry(&household.id, &kid.id, TransactionKind::ChoreReward, 40, 2.0), None)
            .await
            .unwrap();
        repo.record_entry(&entry(&household.id, &kid.id, TransactionKind::RewardRedemption, -15, 0.0), None)
            .await
            .unwrap();

        let summary = repo.summary(&household.id, &kid.id).await.unwrap().unwrap();
        assert_eq!(summary.points_balance, 25);
        assert_eq!(summary.money_balance, 2.0);
        assert_eq!(summary.points_earned, 40);
        assert_eq!(summary.points_spent, 15);

        assert!(repo.summary(&household.id, "user::missing").await.unwrap().is_none());
    }
}
