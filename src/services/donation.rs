//! Donation service
//!
//! Pledges are stored in cents. The public progress bar reads a cached
//! `{total, goal}` pair; the goal lives in the settings table.

use chrono::Utc;
use std::sync::Arc;

use crate::cache::{keys, MemoryCache};
use crate::db::repositories::{DonationRepository, SettingsRepository};
use crate::models::{CreateDonationInput, Donation, DonationsTotal};
use crate::services::settings::keys as setting_keys;
use crate::services::validation::{from_cents, is_valid_email, non_blank, normalize_email, to_cents};

/// Goal shown before an admin sets one, in cents
const DEFAULT_GOAL_CENTS: i64 = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum DonationError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct DonationService {
    repo: Arc<dyn DonationRepository>,
    settings: Arc<dyn SettingsRepository>,
    cache: Arc<MemoryCache>,
}

impl DonationService {
    pub fn new(
        repo: Arc<dyn DonationRepository>,
        settings: Arc<dyn SettingsRepository>,
        cache: Arc<MemoryCache>,
    ) -> Self {
        Self { repo, settings, cache }
    }

    pub async fn total(&self) -> Result<DonationsTotal, DonationError> {
        self.cache
            .get_or_load(keys::DONATIONS_TOTAL, || async {
                let total = self.repo.total_cents().await?;
                let goal = self.goal_cents().await?;
                Ok::<_, DonationError>(DonationsTotal {
                    total: from_cents(total),
                    goal: from_cents(goal),
                })
            })
            .await
    }

    pub async fn donate(&self, input: CreateDonationInput) -> Result<Donation, DonationError> {
        let amount_cents = match to_cents(input.amount) {
            Some(cents) if cents > 0 => cents,
            _ => {
                return Err(DonationError::ValidationError(
                    "Amount must be positive with at most two decimals".to_string(),
                ))
            }
        };

        let email = match non_blank(input.email) {
            Some(email) if !is_valid_email(&email) => {
                return Err(DonationError::ValidationError("Invalid email format".to_string()))
            }
            other => other.map(|e| normalize_email(&e)),
        };

        let donation = Donation {
            id: 0,
            donor_name: non_blank(input.donor_name),
            email,
            amount_cents,
            message: non_blank(input.message),
            created_at: Utc::now(),
        };
        let saved = self.repo.create(&donation).await?;
        self.cache.delete(keys::DONATIONS_TOTAL).await;

        tracing::info!(donation_id = saved.id, amount_cents, "Donation recorded");
        Ok(saved)
    }

    pub async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<Donation>, i64), DonationError> {
        Ok(self.repo.list(page, per_page).await?)
    }

    /// Replace the fundraising goal, in currency units
    pub async fn set_goal(&self, goal: f64) -> Result<DonationsTotal, DonationError> {
        let cents = match to_cents(goal) {
            Some(cents) if cents > 0 => cents,
            _ => {
                return Err(DonationError::ValidationError(
                    "Goal must be a positive amount".to_string(),
                ))
            }
        };

        self.settings
            .set(setting_keys::DONATION_GOAL, &cents.to_string())
            .await?;
        self.cache.delete(keys::DONATIONS_TOTAL).await;
        self.total().await
    }

    async fn goal_cents(&self) -> anyhow::Result<i64> {
        let stored = self.settings.get(setting_keys::DONATION_GOAL).await?;
        Ok(stored
            .and_then(|s| s.value.parse::<i64>().ok())
            .filter(|cents| *cents > 0)
            .unwrap_or(DEFAULT_GOAL_CENTS))
    }
}
