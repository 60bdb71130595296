//! Event repository

use crate::db::DynDatabasePool;
use crate::models::Event;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Event>>;

    /// Events ordered by start time; unpublished ones only when `include_unpublished`
    async fn list(&self, include_unpublished: bool) -> Result<Vec<Event>>;

    async fn update(&self, event: &Event) -> Result<Event>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxEventRepository {
    pool: DynDatabasePool,
}

impl SqlxEventRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EventRepository> {
        Arc::new(Self::new(pool))
    }
}

const EVENT_COLUMNS: &str = "id, title, description, location, image_url, starts_at, ends_at, \
     published, created_at, updated_at";

#[async_trait]
impl EventRepository for SqlxEventRepository {
    async fn create(&self, event: &Event) -> Result<Event> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO events (title, description, location, image_url, starts_at, ends_at,
                                published, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.image_url)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.published)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create event")?;

        Ok(Event {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..event.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get event")?;

        Ok(row.as_ref().map(row_to_event))
    }

    async fn list(&self, include_unpublished: bool) -> Result<Vec<Event>> {
        let sql = if include_unpublished {
            format!("SELECT {} FROM events ORDER BY starts_at", EVENT_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM events WHERE published = 1 ORDER BY starts_at",
                EVENT_COLUMNS
            )
        };

        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list events")?;

        Ok(rows.iter().map(row_to_event).collect())
    }

    async fn update(&self, event: &Event) -> Result<Event> {
        sqlx::query(
            r#"
            UPDATE events
            SET title = ?, description = ?, location = ?, image_url = ?, starts_at = ?,
                ends_at = ?, published = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.image_url)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.published)
        .bind(Utc::now())
        .bind(event.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update event")?;

        self.get_by_id(event.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Event not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete event")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count events")?;
        Ok(count)
    }
}

fn row_to_event(row: &SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        location: row.get("location"),
        image_url: row.get("image_url"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        published: row.get("published"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> Arc<dyn EventRepository> {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxEventRepository::boxed(pool)
    }

    fn event(title: &str, days: i64, published: bool) -> Event {
        let now = Utc::now();
        Event {
            id: 0,
            title: title.into(),
            description: String::new(),
            location: Some("Hall".into()),
            image_url: None,
            starts_at: now + Duration::days(days),
            ends_at: None,
            published,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_hides_drafts() {
        let repo = setup().await;
        repo.create(&event("Later", 10, true)).await.unwrap();
        repo.create(&event("Sooner", 2, true)).await.unwrap();
        repo.create(&event("Draft", 1, false)).await.unwrap();

        let public = repo.list(false).await.unwrap();
        let titles: Vec<_> = public.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Sooner", "Later"]);

        assert_eq!(repo.list(true).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup().await;
        let mut e = repo.create(&event("Fair", 3, false)).await.unwrap();
        e.published = true;
        let updated = repo.update(&e).await.unwrap();
        assert!(updated.published);

        assert!(repo.delete(e.id).await.unwrap());
        assert!(!repo.delete(e.id).await.unwrap());
    }
}
