//! Newsletter models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterSubscriber {
    pub id: i64,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

/// A composed and sent newsletter issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Newsletter {
    pub id: i64,
    pub subject: String,
    pub body_markdown: String,
    pub body_html: String,
    /// Number of subscribers the issue was delivered to
    pub recipient_count: i64,
    pub sent_at: DateTime<Utc>,
}
