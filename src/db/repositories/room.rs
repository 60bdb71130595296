//! Room repository
//!
//! Rentable rooms. `features` is stored as a JSON array in a TEXT column.

use crate::db::DynDatabasePool;
use crate::models::Room;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create(&self, room: &Room) -> Result<Room>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Room>>;

    /// Look up a room by name (case-insensitive)
    async fn get_by_name(&self, name: &str) -> Result<Option<Room>>;

    async fn list(&self) -> Result<Vec<Room>>;

    async fn update(&self, room: &Room) -> Result<Room>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxRoomRepository {
    pool: DynDatabasePool,
}

impl SqlxRoomRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RoomRepository> {
        Arc::new(Self::new(pool))
    }
}

const ROOM_COLUMNS: &str =
    "id, name, description, image_url, capacity, features, hourly_rate_cents, created_at";

#[async_trait]
impl RoomRepository for SqlxRoomRepository {
    async fn create(&self, room: &Room) -> Result<Room> {
        let now = Utc::now();
        let features = serde_json::to_string(&room.features)?;

        let result = sqlx::query(
            r#"
            INSERT INTO rooms (name, description, image_url, capacity, features, hourly_rate_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&room.name)
        .bind(&room.description)
        .bind(&room.image_url)
        .bind(room.capacity)
        .bind(features)
        .bind(room.hourly_rate_cents)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create room")?;

        Ok(Room {
            id: result.last_insert_rowid(),
            created_at: now,
            ..room.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Room>> {
        let row = sqlx::query(&format!("SELECT {} FROM rooms WHERE id = ?", ROOM_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get room")?;

        row.as_ref().map(row_to_room).transpose()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Room>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM rooms WHERE name = ? COLLATE NOCASE",
            ROOM_COLUMNS
        ))
        .bind(name)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get room by name")?;

        row.as_ref().map(row_to_room).transpose()
    }

    async fn list(&self) -> Result<Vec<Room>> {
        let rows = sqlx::query(&format!("SELECT {} FROM rooms ORDER BY name", ROOM_COLUMNS))
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list rooms")?;

        rows.iter().map(row_to_room).collect()
    }

    async fn update(&self, room: &Room) -> Result<Room> {
        let features = serde_json::to_string(&room.features)?;

        sqlx::query(
            r#"
            UPDATE rooms
            SET name = ?, description = ?, image_url = ?, capacity = ?, features = ?, hourly_rate_cents = ?
            WHERE id = ?
            "#,
        )
        .bind(&room.name)
        .bind(&room.description)
        .bind(&room.image_url)
        .bind(room.capacity)
        .bind(features)
        .bind(room.hourly_rate_cents)
        .bind(room.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update room")?;

        self.get_by_id(room.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Room not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete room")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count rooms")?;
        Ok(count)
    }
}

fn row_to_room(row: &SqliteRow) -> Result<Room> {
    let features: String = row.get("features");
    let features: Vec<String> =
        serde_json::from_str(&features).context("Invalid room features JSON")?;

    Ok(Room {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        image_url: row.get("image_url"),
        capacity: row.get("capacity"),
        features,
        hourly_rate_cents: row.get("hourly_rate_cents"),
        created_at: row.get("created_at"),
    })
}
