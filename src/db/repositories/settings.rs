//! Settings repository
//!
//! Key/value site settings such as `site_name` and `donation_goal`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::DynDatabasePool;

/// A setting key-value pair
#[derive(Debug, Clone)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for settings operations
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Get a single setting by key
    async fn get(&self, key: &str) -> Result<Option<Setting>>;

    /// Get all settings
    async fn get_all(&self) -> Result<Vec<Setting>>;

    /// Get multiple settings by keys; missing keys are left out
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>>;

    /// Insert or replace a setting
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;
}

/// SQLx-based settings repository
pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

fn row_to_setting(r: &sqlx::sqlite::SqliteRow) -> Setting {
    Setting {
        key: r.get("key"),
        value: r.get("value"),
        updated_at: r.get("updated_at"),
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<Setting>> {
        let row = sqlx::query("SELECT key, value, updated_at FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to read setting")?;

        Ok(row.as_ref().map(row_to_setting))
    }

    async fn get_all(&self) -> Result<Vec<Setting>> {
        let rows = sqlx::query("SELECT key, value, updated_at FROM settings ORDER BY key")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list settings")?;

        Ok(rows.iter().map(row_to_setting).collect())
    }

    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        let mut result = HashMap::new();
        for key in keys {
            if let Some(setting) = self.get(key).await? {
                result.insert(setting.key, setting.value);
            }
        }
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to write setting")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete setting")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> Arc<dyn SettingsRepository> {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxSettingsRepository::boxed(pool)
    }

    #[tokio::test]
    async fn test_seeded_defaults() {
        let repo = setup().await;
        let goal = repo.get("donation_goal").await.unwrap().unwrap();
        assert_eq!(goal.value, "10000");
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let repo = setup().await;
        repo.set("donation_goal", "25000").await.unwrap();
        repo.set("donation_goal", "30000").await.unwrap();

        let many = repo.get_many(&["donation_goal", "missing"]).await.unwrap();
        assert_eq!(many.get("donation_goal").map(String::as_str), Some("30000"));
        assert!(!many.contains_key("missing"));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;
        repo.set("temp", "1").await.unwrap();
        repo.delete("temp").await.unwrap();
        assert!(repo.get("temp").await.unwrap().is_none());
    }
}
