//! Site image repository

use crate::db::DynDatabasePool;
use crate::models::SiteImage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

#[async_trait]
pub trait SiteImageRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<SiteImage>>;

    async fn list(&self) -> Result<Vec<SiteImage>>;

    /// Insert or replace the image assigned to `key`
    async fn upsert(&self, key: &str, url: &str, alt_text: Option<&str>) -> Result<SiteImage>;

    async fn delete(&self, key: &str) -> Result<bool>;
}

pub struct SqlxSiteImageRepository {
    pool: DynDatabasePool,
}

impl SqlxSiteImageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SiteImageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SiteImageRepository for SqlxSiteImageRepository {
    async fn get(&self, key: &str) -> Result<Option<SiteImage>> {
        let row = sqlx::query("SELECT id, key, url, alt_text, updated_at FROM site_images WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get site image")?;

        Ok(row.as_ref().map(row_to_image))
    }

    async fn list(&self) -> Result<Vec<SiteImage>> {
        let rows = sqlx::query("SELECT id, key, url, alt_text, updated_at FROM site_images ORDER BY key")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list site images")?;

        Ok(rows.iter().map(row_to_image).collect())
    }

    async fn upsert(&self, key: &str, url: &str, alt_text: Option<&str>) -> Result<SiteImage> {
        sqlx::query(
            "INSERT INTO site_images (key, url, alt_text, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET url = excluded.url, alt_text = excluded.alt_text,
                                            updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(url)
        .bind(alt_text)
        .bind(Utc::now())
        .execute(self.pool.sqlite())
        .await
        .context("Failed to save site image")?;

        self.get(key)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Site image missing after upsert"))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM site_images WHERE key = ?")
            .bind(key)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete site image")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_image(row: &SqliteRow) -> SiteImage {
    SiteImage {
        id: row.get("id"),
        key: row.get("key"),
        url: row.get("url"),
        alt_text: row.get("alt_text"),
        updated_at: row.get("updated_at"),
    }
}
