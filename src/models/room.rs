//! Rentable room model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A room that can be booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Maximum number of attendees
    pub capacity: i64,
    /// Amenities shown on the rentals page ("Projector", "Kitchen access", ...)
    pub features: Vec<String>,
    /// Price per started hour, in cents
    pub hourly_rate_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or replacing a room
#[derive(Debug, Clone, Deserialize)]
pub struct RoomInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub capacity: i64,
    #[serde(default)]
    pub features: Vec<String>,
    /// Hourly rate in currency units (e.g. 45.50)
    pub hourly_rate: f64,
}
