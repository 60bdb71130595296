//! Room service
//!
//! Rentable rooms. The public listing is served from the query cache and
//! invalidated on every admin write.

use std::sync::Arc;

use crate::cache::{keys, MemoryCache};
use crate::db::repositories::RoomRepository;
use crate::models::{Room, RoomInput};
use crate::services::validation::to_cents;

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Room not found")]
    NotFound,

    #[error("A room named '{0}' already exists")]
    DuplicateName(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct RoomService {
    repo: Arc<dyn RoomRepository>,
    cache: Arc<MemoryCache>,
}

impl RoomService {
    pub fn new(repo: Arc<dyn RoomRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn list(&self) -> Result<Vec<Room>, RoomError> {
        let repo = &self.repo;
        self.cache
            .get_or_load(keys::ROOMS, || async { repo.list().await.map_err(RoomError::from) })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Room, RoomError> {
        self.repo.get_by_id(id).await?.ok_or(RoomError::NotFound)
    }

    pub async fn create(&self, input: RoomInput) -> Result<Room, RoomError> {
        let room = build_room(0, input)?;
        if self.repo.get_by_name(&room.name).await?.is_some() {
            return Err(RoomError::DuplicateName(room.name));
        }

        let created = self.repo.create(&room).await?;
        self.cache.delete(keys::ROOMS).await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: RoomInput) -> Result<Room, RoomError> {
        let existing = self.get(id).await?;
        let mut room = build_room(id, input)?;
        room.created_at = existing.created_at;

        if let Some(other) = self.repo.get_by_name(&room.name).await? {
            if other.id != id {
                return Err(RoomError::DuplicateName(room.name));
            }
        }

        let updated = self.repo.update(&room).await?;
        self.cache.delete(keys::ROOMS).await;
        Ok(updated)
    }

    /// Delete a room; its bookings go with it
    pub async fn delete(&self, id: i64) -> Result<(), RoomError> {
        self.get(id).await?;
        self.repo.delete(id).await?;
        self.cache.delete(keys::ROOMS).await;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, RoomError> {
        Ok(self.repo.count().await?)
    }
}

fn build_room(id: i64, input: RoomInput) -> Result<Room, RoomError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(RoomError::ValidationError("Name cannot be empty".to_string()));
    }
    if input.capacity < 1 {
        return Err(RoomError::ValidationError("Capacity must be at least 1".to_string()));
    }
    let hourly_rate_cents = to_cents(input.hourly_rate).ok_or_else(|| {
        RoomError::ValidationError("Hourly rate must be a non-negative amount".to_string())
    })?;

    let features = input
        .features
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();

    Ok(Room {
        id,
        name,
        description: input.description.trim().to_string(),
        image_url: input.image_url.filter(|u| !u.trim().is_empty()),
        capacity: input.capacity,
        features,
        hourly_rate_cents,
        created_at: chrono::Utc::now(),
    })
}
