//! Newsletter service
//!
//! Subscription management and issue delivery. Issues are written in
//! Markdown, rendered once with pulldown-cmark and mailed to every subscriber
//! with a small bound on concurrent sends.

use anyhow::Context;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use pulldown_cmark::{html, Event, Options, Parser};
use serde::Serialize;
use std::sync::Arc;

use crate::db::repositories::NewsletterRepository;
use crate::models::{Newsletter, NewsletterSubscriber};
use crate::services::email::EmailService;
use crate::services::validation::{is_valid_email, normalize_email};

/// Maximum number of newsletter emails in flight at once
const SEND_CONCURRENCY: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum NewsletterError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of a subscribe request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscribeOutcome {
    pub subscribed: bool,
    pub already_subscribed: bool,
}

pub struct NewsletterService {
    repo: Arc<dyn NewsletterRepository>,
    email: Arc<EmailService>,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn NewsletterRepository>, email: Arc<EmailService>) -> Self {
        Self { repo, email }
    }

    /// Add an address to the list. Subscribing twice is not an error.
    pub async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, NewsletterError> {
        if !is_valid_email(email) {
            return Err(NewsletterError::ValidationError("Invalid email format".to_string()));
        }

        let inserted = self.repo.subscribe(&normalize_email(email)).await?;
        Ok(SubscribeOutcome {
            subscribed: true,
            already_subscribed: !inserted,
        })
    }

    /// Remove an address; returns whether it was on the list
    pub async fn unsubscribe(&self, email: &str) -> Result<bool, NewsletterError> {
        Ok(self.repo.unsubscribe(&normalize_email(email)).await?)
    }

    pub async fn list_subscribers(&self) -> Result<Vec<NewsletterSubscriber>, NewsletterError> {
        Ok(self.repo.list_subscribers().await?)
    }

    pub async fn count_subscribers(&self) -> Result<i64, NewsletterError> {
        Ok(self.repo.count_subscribers().await?)
    }

    pub async fn list_issues(&self) -> Result<Vec<Newsletter>, NewsletterError> {
        Ok(self.repo.list_issues().await?)
    }

    /// Render and send an issue to every subscriber, then record it.
    ///
    /// Individual delivery failures are logged and excluded from
    /// `recipient_count`; they do not abort the run.
    pub async fn send(&self, subject: &str, body_markdown: &str) -> Result<Newsletter, NewsletterError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(NewsletterError::ValidationError("Subject cannot be empty".to_string()));
        }
        if body_markdown.trim().is_empty() {
            return Err(NewsletterError::ValidationError("Body cannot be empty".to_string()));
        }

        let body_html = render_markdown(body_markdown);
        let subscribers = self
            .repo
            .list_subscribers()
            .await
            .context("Failed to load subscribers")?;

        let delivered = stream::iter(subscribers)
            .map(|sub| {
                let email = Arc::clone(&self.email);
                let rendered = body_html.as_str();
                async move {
                    match email.send_newsletter(&sub.email, subject, rendered, body_markdown).await {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!(to = %sub.email, "Newsletter delivery failed: {}", e);
                            false
                        }
                    }
                }
            })
            .buffer_unordered(SEND_CONCURRENCY)
            .filter(|ok| futures::future::ready(*ok))
            .count()
            .await;

        tracing::info!(subject, delivered, "Newsletter sent");

        let issue = Newsletter {
            id: 0,
            subject: subject.to_string(),
            body_markdown: body_markdown.to_string(),
            body_html,
            recipient_count: delivered as i64,
            sent_at: Utc::now(),
        };
        Ok(self.repo.record_issue(&issue).await?)
    }
}

/// Markdown to HTML. Raw HTML in the source is escaped, not passed through.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;
    use crate::db::repositories::SqlxNewsletterRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (NewsletterService, Arc<EmailService>) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let email = Arc::new(EmailService::new(&EmailConfig::default()).unwrap());
        (
            NewsletterService::new(SqlxNewsletterRepository::boxed(pool), email.clone()),
            email,
        )
    }

    #[tokio::test]
    async fn test_subscribe_twice() {
        let (service, _) = setup().await;

        let first = service.subscribe("Quinn@Example.org").await.unwrap();
        assert_eq!(first, SubscribeOutcome { subscribed: true, already_subscribed: false });

        let again = service.subscribe("quinn@example.org").await.unwrap();
        assert!(again.subscribed);
        assert!(again.already_subscribed);
        assert_eq!(service.count_subscribers().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_rejects_bad_email() {
        let (service, _) = setup().await;
        assert!(matches!(
            service.subscribe("quinn").await,
            Err(NewsletterError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_send_reaches_every_subscriber() {
        let (service, email) = setup().await;
        for i in 0..6 {
            service.subscribe(&format!("reader{}@example.org", i)).await.unwrap();
        }

        let issue = service.send("June news", "# Fair\n\nSee you **there**.").await.unwrap();
        assert_eq!(issue.recipient_count, 6);
        assert!(issue.body_html.contains("<h1>Fair</h1>"));
        assert_eq!(email.sent_count(), 6);
        assert_eq!(service.list_issues().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_requires_subject_and_body() {
        let (service, _) = setup().await;
        assert!(service.send(" ", "body").await.is_err());
        assert!(service.send("subject", "\n").await.is_err());
    }

    #[test]
    fn test_render_markdown_escapes_raw_html() {
        let html = render_markdown("Hello <script>alert(1)</script>\n\n| a |\n|---|\n| 1 |");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<table>"));
    }
}
