//! Contact message repository

use crate::db::DynDatabasePool;
use crate::models::ContactMessage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

#[async_trait]
pub trait ContactMessageRepository: Send + Sync {
    async fn create(&self, message: &ContactMessage) -> Result<ContactMessage>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactMessage>>;

    /// Newest first
    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<ContactMessage>, i64)>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxContactMessageRepository {
    pool: DynDatabasePool,
}

impl SqlxContactMessageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactMessageRepository> {
        Arc::new(Self::new(pool))
    }
}

const MESSAGE_COLUMNS: &str =
    "id, name, email, subject, message, attachments, newsletter_opt_in, created_at";

#[async_trait]
impl ContactMessageRepository for SqlxContactMessageRepository {
    async fn create(&self, message: &ContactMessage) -> Result<ContactMessage> {
        let now = Utc::now();
        let attachments = serde_json::to_string(&message.attachments)?;

        let result = sqlx::query(
            r#"
            INSERT INTO contact_messages (name, email, subject, message, attachments, newsletter_opt_in, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.subject)
        .bind(&message.message)
        .bind(attachments)
        .bind(message.newsletter_opt_in)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to store contact message")?;

        Ok(ContactMessage {
            id: result.last_insert_rowid(),
            created_at: now,
            ..message.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactMessage>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM contact_messages WHERE id = ?",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get contact message")?;

        row.as_ref().map(row_to_message).transpose()
    }

    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<ContactMessage>, i64)> {
        let per_page = per_page.clamp(1, 100);
        let offset = (page.max(1) - 1) * per_page;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM contact_messages ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            MESSAGE_COLUMNS
        ))
        .bind(per_page)
        .bind(offset)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list contact messages")?;

        let messages = rows.iter().map(row_to_message).collect::<Result<Vec<_>>>()?;
        Ok((messages, self.count().await?))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete contact message")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count contact messages")?;
        Ok(count)
    }
}

fn row_to_message(row: &SqliteRow) -> Result<ContactMessage> {
    let attachments: String = row.get("attachments");

    Ok(ContactMessage {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        subject: row.get("subject"),
        message: row.get("message"),
        attachments: serde_json::from_str(&attachments)
            .context("Invalid attachments JSON")?,
        newsletter_opt_in: row.get("newsletter_opt_in"),
        created_at: row.get("created_at"),
    })
}
