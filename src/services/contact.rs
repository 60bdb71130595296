//! Contact form service
//!
//! Stores submissions with their attachments, subscribes senders who opted
//! in to the newsletter and notifies the admin recipient by email.

use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::ContactMessageRepository;
use crate::models::{ContactInput, ContactMessage};
use crate::services::email::EmailService;
use crate::services::newsletter::{NewsletterError, NewsletterService};
use crate::services::upload::{UploadError, UploadService};
use crate::services::validation::is_valid_email;

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Message not found")]
    NotFound,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<NewsletterError> for ContactError {
    fn from(e: NewsletterError) -> Self {
        match e {
            NewsletterError::ValidationError(msg) => ContactError::ValidationError(msg),
            NewsletterError::InternalError(e) => ContactError::InternalError(e),
        }
    }
}

/// A file received with the form, not yet written to disk
#[derive(Debug, Clone)]
pub struct PendingAttachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

pub struct ContactService {
    repo: Arc<dyn ContactMessageRepository>,
    uploads: Arc<UploadService>,
    newsletter: Arc<NewsletterService>,
    email: Arc<EmailService>,
}

impl ContactService {
    pub fn new(
        repo: Arc<dyn ContactMessageRepository>,
        uploads: Arc<UploadService>,
        newsletter: Arc<NewsletterService>,
        email: Arc<EmailService>,
    ) -> Self {
        Self {
            repo,
            uploads,
            newsletter,
            email,
        }
    }

    /// Accept a contact form submission.
    ///
    /// Every attachment is validated before any is written, so a rejected
    /// upload leaves nothing behind. The admin notification is best effort.
    pub async fn submit(
        &self,
        input: ContactInput,
        attachments: Vec<PendingAttachment>,
    ) -> Result<ContactMessage, ContactError> {
        let input = validate_input(input)?;

        let max = self.uploads.config().max_attachments;
        if attachments.len() > max {
            return Err(ContactError::ValidationError(format!(
                "At most {} attachments are allowed",
                max
            )));
        }
        for file in &attachments {
            self.uploads.validate(&file.content_type, file.data.len() as u64)?;
        }

        let mut urls = Vec::with_capacity(attachments.len());
        for file in &attachments {
            let stored = self
                .uploads
                .store(&file.file_name, &file.content_type, &file.data)
                .await?;
            urls.push(stored.url);
        }

        let message = ContactMessage {
            id: 0,
            name: input.name,
            email: input.email,
            subject: input.subject,
            message: input.message,
            attachments: urls,
            newsletter_opt_in: input.newsletter,
            created_at: Utc::now(),
        };
        let saved = self.repo.create(&message).await?;

        if saved.newsletter_opt_in {
            self.newsletter.subscribe(&saved.email).await?;
        }

        if let Err(e) = self.email.send_contact_notification(&saved).await {
            tracing::warn!(message_id = saved.id, "Contact notification failed: {}", e);
        }

        tracing::info!(
            message_id = saved.id,
            attachments = saved.attachments.len(),
            "Contact message received"
        );
        Ok(saved)
    }

    pub async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<ContactMessage>, i64), ContactError> {
        Ok(self.repo.list(page, per_page).await?)
    }

    /// Delete a message and its stored attachments
    pub async fn delete(&self, id: i64) -> Result<(), ContactError> {
        let message = self.repo.get_by_id(id).await?.ok_or(ContactError::NotFound)?;
        self.repo.delete(id).await?;

        for url in &message.attachments {
            if let Err(e) = self.uploads.remove_by_url(url).await {
                tracing::warn!(url = %url, "Failed to remove attachment: {}", e);
            }
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, ContactError> {
        Ok(self.repo.count().await?)
    }
}

fn validate_input(input: ContactInput) -> Result<ContactInput, ContactError> {
    let trimmed = ContactInput {
        name: input.name.trim().to_string(),
        email: input.email.trim().to_string(),
        subject: input.subject.trim().to_string(),
        message: input.message.trim().to_string(),
        newsletter: input.newsletter,
    };

    for (field, value) in [
        ("name", &trimmed.name),
        ("email", &trimmed.email),
        ("subject", &trimmed.subject),
        ("message", &trimmed.message),
    ] {
        if value.is_empty() {
            return Err(ContactError::ValidationError(format!("{} is required", field)));
        }
    }
    if !is_valid_email(&trimmed.email) {
        return Err(ContactError::ValidationError("Invalid email format".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmailConfig, UploadConfig};
    use crate::db::repositories::{SqlxContactMessageRepository, SqlxNewsletterRepository};
    use crate::db::{create_test_pool, migrations};
    use tempfile::TempDir;

    struct Fixture {
        service: ContactService,
        newsletter: Arc<NewsletterService>,
        _dir: TempDir,
        upload_dir: std::path::PathBuf,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let dir = TempDir::new().unwrap();
        let upload_dir = dir.path().join("uploads");
        let uploads = Arc::new(UploadService::new(UploadConfig {
            path: upload_dir.clone(),
            max_attachments: 2,
            ..UploadConfig::default()
        }));
        let email = Arc::new(EmailService::new(&EmailConfig::default()).unwrap());
        let newsletter = Arc::new(NewsletterService::new(
            SqlxNewsletterRepository::boxed(pool.clone()),
            email.clone(),
        ));
        let service = ContactService::new(
            SqlxContactMessageRepository::boxed(pool),
            uploads,
            newsletter.clone(),
            email,
        );

        Fixture {
            service,
            newsletter,
            _dir: dir,
            upload_dir,
        }
    }

    fn input(newsletter: bool) -> ContactInput {
        ContactInput {
            name: "Jordan".into(),
            email: "jordan@example.org".into(),
            subject: "Volunteering".into(),
            message: "How can I help?".into(),
            newsletter,
        }
    }

    fn pdf() -> PendingAttachment {
        PendingAttachment {
            file_name: "cv.pdf".into(),
            content_type: "application/pdf".into(),
            data: b"%PDF-1.4".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_submit_with_attachment_and_opt_in() {
        let fx = setup().await;
        let saved = fx.service.submit(input(true), vec![pdf()]).await.unwrap();

        assert_eq!(saved.attachments.len(), 1);
        assert!(saved.attachments[0].ends_with(".pdf"));
        assert_eq!(fx.newsletter.count_subscribers().await.unwrap(), 1);
        assert_eq!(std::fs::read_dir(&fx.upload_dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_fields() {
        let fx = setup().await;
        let mut bad = input(false);
        bad.subject = "   ".into();

        assert!(matches!(
            fx.service.submit(bad, vec![]).await,
            Err(ContactError::ValidationError(_))
        ));
        assert_eq!(fx.service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bad_attachment_writes_nothing() {
        let fx = setup().await;
        let exe = PendingAttachment {
            file_name: "run.exe".into(),
            content_type: "application/x-msdownload".into(),
            data: b"MZ".to_vec(),
        };

        let result = fx.service.submit(input(false), vec![pdf(), exe]).await;
        assert!(matches!(result, Err(ContactError::Upload(UploadError::UnsupportedType(_)))));
        assert!(!fx.upload_dir.exists());
        assert_eq!(fx.service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_attachment_count_limit() {
        let fx = setup().await;
        let result = fx.service.submit(input(false), vec![pdf(), pdf(), pdf()]).await;
        assert!(matches!(result, Err(ContactError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_files() {
        let fx = setup().await;
        let saved = fx.service.submit(input(false), vec![pdf()]).await.unwrap();

        fx.service.delete(saved.id).await.unwrap();
        assert_eq!(std::fs::read_dir(&fx.upload_dir).unwrap().count(), 0);
        assert!(matches!(fx.service.delete(saved.id).await, Err(ContactError::NotFound)));
    }
}
