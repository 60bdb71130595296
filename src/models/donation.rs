//! Donation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: i64,
    pub donor_name: Option<String>,
    pub email: Option<String>,
    pub amount_cents: i64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Progress toward the fundraising goal, in whole currency units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DonationsTotal {
    pub total: f64,
    pub goal: f64,
}

impl DonationsTotal {
    /// Share of the goal reached, capped at 100
    pub fn percent(&self) -> f64 {
        if self.goal <= 0.0 {
            return 0.0;
        }
        (self.total / self.goal * 100.0).min(100.0)
    }
}

/// Donation pledge submitted from the fundraising page
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDonationInput {
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Amount in currency units, at most two decimals
    pub amount: f64,
    #[serde(default)]
    pub message: Option<String>,
}
