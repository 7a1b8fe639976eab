use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use shared::Event;
use crate::backend::storage::connection::DbConnection;

/// Repository for household calendar events
#[derive(Clone)]
pub struct EventRepository {
    db: DbConnection,
}

const EVENT_COLUMNS: &str =
    "id, household_id, title, description, location, starts_at, ends_at, created_by, created_at, updated_at";

fn row_to_event(row: &SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        household_id: row.get("household_id"),
        title: row.get("title"),
        description: row.get("description"),
        location: row.get("location"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl EventRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, household_id, title, description, location, starts_at, ends_at,
                                created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.household_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.starts_at)
        .bind(&event.ends_at)
        .bind(&event.created_by)
        .bind(&event.created_at)
        .bind(&event.updated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_event(&self, household_id: &str, event_id: &str) -> Result<Option<Event>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM events WHERE id = ? AND household_id = ?",
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .bind(household_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(row_to_event))
    }

    /// List events by start time. With `not_ended_before` set, events that
    /// finished (or, lacking an end, started) before that instant are skipped.
    pub async fn list_events(&self, household_id: &str, not_ended_before: Option<&str>) -> Result<Vec<Event>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM events
            WHERE household_id = ?
              AND (? IS NULL OR COALESCE(ends_at, starts_at) >= ?)
            ORDER BY starts_at ASC, title ASC
            "#,
            EVENT_COLUMNS
        ))
        .bind(household_id)
        .bind(not_ended_before)
        .bind(not_ended_before)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(row_to_event).collect())
    }

    pub async fn update_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE events
            SET title = ?, description = ?, location = ?, starts_at = ?, ends_at = ?, updated_at = ?
            WHERE id = ? AND household_id = ?
            "#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.starts_at)
        .bind(&event.ends_at)
        .bind(&event.updated_at)
        .bind(&event.id)
        .bind(&event.household_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_event(&self, household_id: &str, event_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ? AND household_id = ?")
            .bind(event_id)
            .bind(household_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
