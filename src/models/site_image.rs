//! Site image model
//!
//! Admins assign uploaded images to named slots ("hero", "about", ...)
//! that the public pages render.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteImage {
    pub id: i64,
    /// Slot name, lowercase `[a-z0-9_-]`
    pub key: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub updated_at: DateTime<Utc>,
}
