//! Email service
//!
//! Sends contact notifications and newsletter issues over SMTP. With no SMTP
//! host configured the service runs in log-only mode: every message is built
//! and validated as usual, then written to the log and reported as sent.

use anyhow::{anyhow, Context, Result};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::EmailConfig;
use crate::models::ContactMessage;

/// Email service for sending emails
pub struct EmailService {
    from: Mailbox,
    admin_to: Mailbox,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    sent: AtomicU64,
}

impl EmailService {
    /// Build the service from configuration.
    ///
    /// Fails if `from`/`admin_to` are not valid mailboxes or the SMTP relay
    /// cannot be set up.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| anyhow!("Invalid email.from address: {}", e))?;
        let admin_to: Mailbox = config
            .admin_to
            .parse()
            .map_err(|e| anyhow!("Invalid email.admin_to address: {}", e))?;

        let transport = if config.smtp_enabled() {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .context("Failed to create SMTP transport")?
                .port(config.smtp_port);
            if !config.smtp_username.is_empty() {
                builder = builder.credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ));
            }
            Some(builder.build())
        } else {
            tracing::info!("SMTP host not configured; outgoing email will only be logged");
            None
        };

        Ok(Self {
            from,
            admin_to,
            transport,
            sent: AtomicU64::new(0),
        })
    }

    pub fn is_log_only(&self) -> bool {
        self.transport.is_none()
    }

    /// Number of messages handed off successfully since startup
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Tell the admin recipient about a new contact form submission
    pub async fn send_contact_notification(&self, message: &ContactMessage) -> Result<()> {
        let mut body = format!(
            "New message from {} <{}>\n\nSubject: {}\n\n{}\n",
            message.name, message.email, message.subject, message.message
        );
        if !message.attachments.is_empty() {
            body.push_str("\nAttachments:\n");
            for url in &message.attachments {
                body.push_str(&format!("  {}\n", url));
            }
        }
        if message.newsletter_opt_in {
            body.push_str("\nThe sender asked to join the newsletter.\n");
        }

        let email = Message::builder()
            .from(self.from.clone())
            .reply_to(
                format!("{} <{}>", message.name, message.email)
                    .parse::<Mailbox>()
                    .or_else(|_| message.email.parse::<Mailbox>())
                    .map_err(|e| anyhow!("Invalid reply-to address: {}", e))?,
            )
            .to(self.admin_to.clone())
            .subject(format!("[Contact] {}", message.subject))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("Failed to build contact notification")?;

        self.deliver(email).await
    }

    /// Send one newsletter issue to one subscriber
    pub async fn send_newsletter(&self, to: &str, subject: &str, html: &str, text: &str) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| anyhow!("Invalid recipient '{}': {}", to, e))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(text.to_string(), html.to_string()))
            .context("Failed to build newsletter")?;

        self.deliver(email).await
    }

    async fn deliver(&self, email: Message) -> Result<()> {
        match &self.transport {
            Some(mailer) => {
                mailer
                    .send(email)
                    .await
                    .map_err(|e| anyhow!("Failed to send email: {}", e))?;
            }
            None => {
                let envelope = email.envelope();
                tracing::info!(
                    from = ?envelope.from(),
                    to = ?envelope.to(),
                    "Email (log-only mode)"
                );
                tracing::debug!("{}", String::from_utf8_lossy(&email.formatted()));
            }
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
