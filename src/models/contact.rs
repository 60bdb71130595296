//! Contact form message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message submitted through the contact form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    /// Public URLs of uploaded attachments
    pub attachments: Vec<String>,
    pub newsletter_opt_in: bool,
    pub created_at: DateTime<Utc>,
}

/// Contact form fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub newsletter: bool,
}
