//! Room booking model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Submitted, awaiting staff review
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Whether the booking still blocks its time slot
    pub fn holds_slot(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid booking status: {}", s)),
        }
    }
}

/// A reservation of a room for a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub room_id: i64,
    /// Account that made the booking, if it still exists
    pub user_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub event_type: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: i64,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Half-open interval overlap: `[start, end)` against `[other_start, other_end)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// Booking request submitted through the booking form
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingInput {
    pub room_id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: i64,
    #[serde(default)]
    pub notes: Option<String>,
}
