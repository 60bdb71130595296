//! Newsletter repository
//!
//! Subscribers plus the log of issues that have been sent.

use crate::db::DynDatabasePool;
use crate::models::{Newsletter, NewsletterSubscriber};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait NewsletterRepository: Send + Sync {
    /// Insert a subscriber; returns `false` when the email was already present
    async fn subscribe(&self, email: &str) -> Result<bool>;

    /// Remove a subscriber; returns whether a row was deleted
    async fn unsubscribe(&self, email: &str) -> Result<bool>;

    async fn list_subscribers(&self) -> Result<Vec<NewsletterSubscriber>>;

    async fn count_subscribers(&self) -> Result<i64>;

    async fn record_issue(&self, issue: &Newsletter) -> Result<Newsletter>;

    /// Sent issues, newest first
    async fn list_issues(&self) -> Result<Vec<Newsletter>>;
}

pub struct SqlxNewsletterRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsletterRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsletterRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NewsletterRepository for SqlxNewsletterRepository {
    async fn subscribe(&self, email: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO newsletter_subscribers (email, subscribed_at) VALUES (?, ?)
             ON CONFLICT(email) DO NOTHING",
        )
        .bind(email)
        .bind(Utc::now())
        .execute(self.pool.sqlite())
        .await
        .context("Failed to subscribe")?;

        Ok(result.rows_affected() > 0)
    }

    async fn unsubscribe(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM newsletter_subscribers WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to unsubscribe")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_subscribers(&self) -> Result<Vec<NewsletterSubscriber>> {
        let rows = sqlx::query(
            "SELECT id, email, subscribed_at FROM newsletter_subscribers ORDER BY subscribed_at, id",
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list subscribers")?;

        Ok(rows
            .into_iter()
            .map(|r| NewsletterSubscriber {
                id: r.get("id"),
                email: r.get("email"),
                subscribed_at: r.get("subscribed_at"),
            })
            .collect())
    }

    async fn count_subscribers(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM newsletter_subscribers")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count subscribers")?;
        Ok(count)
    }

    async fn record_issue(&self, issue: &Newsletter) -> Result<Newsletter> {
        let result = sqlx::query(
            r#"
            INSERT INTO newsletters (subject, body_markdown, body_html, recipient_count, sent_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&issue.subject)
        .bind(&issue.body_markdown)
        .bind(&issue.body_html)
        .bind(issue.recipient_count)
        .bind(issue.sent_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to record newsletter issue")?;

        Ok(Newsletter {
            id: result.last_insert_rowid(),
            ..issue.clone()
        })
    }

    async fn list_issues(&self) -> Result<Vec<Newsletter>> {
        let rows = sqlx::query(
            "SELECT id, subject, body_markdown, body_html, recipient_count, sent_at
             FROM newsletters ORDER BY sent_at DESC, id DESC",
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list newsletter issues")?;

        Ok(rows
            .into_iter()
            .map(|r| Newsletter {
                id: r.get("id"),
                subject: r.get("subject"),
                body_markdown: r.get("body_markdown"),
                body_html: r.get("body_html"),
                recipient_count: r.get("recipient_count"),
                sent_at: r.get("sent_at"),
            })
            .collect())
    }
}
