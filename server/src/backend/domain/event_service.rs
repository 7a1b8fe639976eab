use anyhow::Result;
use chrono::Utc;
use shared::validation::{parse_timestamp, validate_create_event, validate_event_window, validate_update_event};
use shared::{CreateEventRequest, Event, EventListRequest, EventListResponse, UpdateEventRequest, User};
use tracing::info;

use crate::backend::domain::errors::validated;
use crate::backend::domain::{ensure_parent, now_timestamp, timestamp, DomainError};
use crate::backend::storage::{DbConnection, EventRepository};

/// Service for the household calendar
#[derive(Clone)]
pub struct EventService {
    events: EventRepository,
}

/// Store timestamps in one format so they order correctly as text
fn normalize(value: &str) -> String {
    parse_timestamp(value).map(timestamp).unwrap_or_else(|| value.trim().to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl EventService {
    pub fn new(db: DbConnection) -> Self {
        Self { events: EventRepository::new(db) }
    }

    pub async fn list_events(&self, actor: &User, query: EventListRequest) -> Result<EventListResponse> {
        let now = query.upcoming.then(now_timestamp);
        let events = self.events.list_events(&actor.household_id, now.as_deref()).await?;
        info!("Found {} events for {} (upcoming={})", events.len(), actor.household_id, query.upcoming);
        Ok(EventListResponse { events })
    }

    pub async fn get_event(&self, actor: &User, event_id: &str) -> Result<Event> {
        self.events
            .get_event(&actor.household_id, event_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Event").into())
    }

    pub async fn create_event(&self, actor: &User, request: CreateEventRequest) -> Result<Event> {
        ensure_parent(actor, "create events")?;
        validated(validate_create_event(&request, Utc::now()))?;

        let now = now_timestamp();
        let event = Event {
            id: Event::generate_id(),
            household_id: actor.household_id.clone(),
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            location: optional_text(request.location),
            starts_at: normalize(&request.starts_at),
            ends_at: request.ends_at.as_deref().map(normalize),
            created_by: actor.id.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.events.store_event(&event).await?;

        info!("Created event '{}' with ID: {}", event.title, event.id);
        Ok(event)
    }

    pub async fn update_event(&self, actor: &User, event_id: &str, request: UpdateEventRequest) -> Result<Event> {
        ensure_parent(actor, "edit events")?;
        let mut event = self.get_event(actor, event_id).await?;
        validated(validate_update_event(&request, Utc::now()))?;

        if let Some(title) = request.title {
            event.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            event.description = description.trim().to_string();
        }
        if request.location.is_some() {
            event.location = optional_text(request.location);
        }
        if let Some(starts_at) = request.starts_at {
            event.starts_at = normalize(&starts_at);
        }
        if let Some(ends_at) = request.ends_at {
            event.ends_at = Some(normalize(&ends_at));
        }
        validated(validate_event_window(&event.starts_at, event.ends_at.as_deref()))?;
        event.updated_at = now_timestamp();

        self.events.update_event(&event).await?;
        info!("Updated event {}", event.id);
        Ok(event)
    }

    pub async fn delete_event(&self, actor: &User, event_id: &str) -> Result<()> {
        ensure_parent(actor, "delete events")?;
        if !self.events.delete_event(&actor.household_id, event_id).await? {
            return Err(DomainError::not_found("Event").into());
        }
        info!("Deleted event {}", event_id);
        Ok(())
    }
}
