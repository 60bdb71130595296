//! Event service
//!
//! Public listings are cached under `events:upcoming` and `events:all`;
//! any admin write drops both.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::cache::{keys, MemoryCache};
use crate::db::repositories::EventRepository;
use crate::models::{Event, EventInput};
use crate::services::validation::non_blank;

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Event not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct EventService {
    repo: Arc<dyn EventRepository>,
    cache: Arc<MemoryCache>,
}

impl EventService {
    pub fn new(repo: Arc<dyn EventRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    /// Published events, upcoming ones first in start order.
    ///
    /// Without `include_past`, events that have already finished are left out;
    /// with it they follow the upcoming ones, most recent first.
    pub async fn list_public(&self, include_past: bool) -> Result<Vec<Event>, EventError> {
        let repo = &self.repo;
        let published = || async { repo.list(false).await.map_err(EventError::from) };

        if include_past {
            let events: Vec<Event> = self.cache.get_or_load(keys::EVENTS_ALL, published).await?;
            return Ok(upcoming_first(events, Utc::now()));
        }

        let events: Vec<Event> = self.cache.get_or_load(keys::EVENTS_UPCOMING, published).await?;
        // The cached list may have been filled before some events finished
        Ok(filter_upcoming(events, Utc::now()))
    }

    /// A published event by id; drafts are reported as missing
    pub async fn get_public(&self, id: i64) -> Result<Event, EventError> {
        match self.repo.get_by_id(id).await? {
            Some(event) if event.published => Ok(event),
            _ => Err(EventError::NotFound),
        }
    }

    /// Every event including drafts, for the back-office
    pub async fn list_all(&self) -> Result<Vec<Event>, EventError> {
        Ok(self.repo.list(true).await?)
    }

    pub async fn create(&self, input: EventInput) -> Result<Event, EventError> {
        let event = build_event(0, input, Utc::now())?;
        let created = self.repo.create(&event).await?;
        self.invalidate().await;

        tracing::info!(event_id = created.id, "Event created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: EventInput) -> Result<Event, EventError> {
        let existing = self.repo.get_by_id(id).await?.ok_or(EventError::NotFound)?;
        let mut event = build_event(id, input, Utc::now())?;
        event.created_at = existing.created_at;

        let updated = self.repo.update(&event).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), EventError> {
        if !self.repo.delete(id).await? {
            return Err(EventError::NotFound);
        }
        self.invalidate().await;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, EventError> {
        Ok(self.repo.count().await?)
    }

    async fn invalidate(&self) {
        self.cache.delete_pattern(keys::EVENTS_PATTERN).await;
    }
}

fn filter_upcoming(events: Vec<Event>, now: DateTime<Utc>) -> Vec<Event> {
    events.into_iter().filter(|e| e.is_upcoming(now)).collect()
}

/// Upcoming events in start order, then past events newest first
fn upcoming_first(events: Vec<Event>, now: DateTime<Utc>) -> Vec<Event> {
    let (mut upcoming, mut past): (Vec<Event>, Vec<Event>) =
        events.into_iter().partition(|e| e.is_upcoming(now));
    upcoming.sort_by_key(|e| e.starts_at);
    past.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
    upcoming.extend(past);
    upcoming
}

fn build_event(id: i64, input: EventInput, now: DateTime<Utc>) -> Result<Event, EventError> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(EventError::ValidationError("Title cannot be empty".to_string()));
    }
    if let Some(ends_at) = input.ends_at {
        if ends_at < input.starts_at {
            return Err(EventError::ValidationError(
                "Event cannot end before it starts".to_string(),
            ));
        }
    }

    Ok(Event {
        id,
        title,
        description: input.description.trim().to_string(),
        location: non_blank(input.location),
        image_url: non_blank(input.image_url),
        starts_at: input.starts_at,
        ends_at: input.ends_at,
        published: input.published,
        created_at: now,
        updated_at: now,
    })
}
