//! Settings service
//!
//! Site-wide values shown on the public pages (name, tagline, contact
//! details) and the fundraising goal.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::SettingsRepository;

/// Known setting keys
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const TAGLINE: &str = "tagline";
    pub const CONTACT_EMAIL: &str = "contact_email";
    pub const CONTACT_PHONE: &str = "contact_phone";
    pub const ADDRESS: &str = "address";
    pub const DONATION_GOAL: &str = "donation_goal";
}

/// Values rendered into every page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub address: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Commonroom Community Center".to_string(),
            tagline: "A place for everyone in the neighbourhood".to_string(),
            contact_email: String::new(),
            contact_phone: String::new(),
            address: String::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("Invalid setting value: {0}")]
    InvalidValue(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Stored site settings, with defaults for anything unset
    pub async fn get_site_settings(&self) -> Result<SiteSettings, SettingsServiceError> {
        let stored = self
            .repo
            .get_many(&[
                keys::SITE_NAME,
                keys::TAGLINE,
                keys::CONTACT_EMAIL,
                keys::CONTACT_PHONE,
                keys::ADDRESS,
            ])
            .await?;
        let defaults = SiteSettings::default();
        let pick = |key: &str, fallback: String| stored.get(key).cloned().unwrap_or(fallback);

        Ok(SiteSettings {
            site_name: pick(keys::SITE_NAME, defaults.site_name),
            tagline: pick(keys::TAGLINE, defaults.tagline),
            contact_email: pick(keys::CONTACT_EMAIL, defaults.contact_email),
            contact_phone: pick(keys::CONTACT_PHONE, defaults.contact_phone),
            address: pick(keys::ADDRESS, defaults.address),
        })
    }

    pub async fn update_site_settings(&self, settings: &SiteSettings) -> Result<SiteSettings, SettingsServiceError> {
        if settings.site_name.trim().is_empty() {
            return Err(SettingsServiceError::InvalidValue(
                "Site name cannot be empty".to_string(),
            ));
        }

        for (key, value) in [
            (keys::SITE_NAME, &settings.site_name),
            (keys::TAGLINE, &settings.tagline),
            (keys::CONTACT_EMAIL, &settings.contact_email),
            (keys::CONTACT_PHONE, &settings.contact_phone),
            (keys::ADDRESS, &settings.address),
        ] {
            self.repo.set(key, value.trim()).await?;
        }
        self.get_site_settings().await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, SettingsServiceError> {
        Ok(self.repo.get(key).await?.map(|s| s.value))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), SettingsServiceError> {
        self.repo.set(key, value).await?;
        Ok(())
    }
}
