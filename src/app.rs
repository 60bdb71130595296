//! Application assembly
//!
//! Wires repositories, services and the cache into an [`AppState`] and starts
//! the periodic maintenance tasks.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{AppState, RequestStats};
use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxBookingRepository, SqlxContactMessageRepository, SqlxDonationRepository,
    SqlxEventRepository, SqlxNewsletterRepository, SqlxRoomRepository, SqlxSessionRepository,
    SqlxSettingsRepository, SqlxSiteImageRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    BookingService, ContactService, DonationService, EmailService, EventService, LoginRateLimiter,
    NewsletterService, RoomService, SettingsService, SiteImageService, UploadService, UserService,
};
use crate::theme::PageRenderer;

/// How often expired sessions are purged
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// How often stale rate-limiter windows are dropped
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Build the shared state for a migrated database
pub fn build_state(config: &Config, pool: DynDatabasePool) -> Result<AppState> {
    let cache = create_cache(&config.cache);

    // Repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let settings_repo = SqlxSettingsRepository::boxed(pool.clone());
    let room_repo = SqlxRoomRepository::boxed(pool.clone());
    let booking_repo = SqlxBookingRepository::boxed(pool.clone());
    let event_repo = SqlxEventRepository::boxed(pool.clone());
    let contact_repo = SqlxContactMessageRepository::boxed(pool.clone());
    let newsletter_repo = SqlxNewsletterRepository::boxed(pool.clone());
    let donation_repo = SqlxDonationRepository::boxed(pool.clone());
    let image_repo = SqlxSiteImageRepository::boxed(pool.clone());

    // Services
    let email_service = Arc::new(EmailService::new(&config.email).context("Invalid email configuration")?);
    let upload_service = Arc::new(UploadService::new(config.upload.clone()));
    let user_service = Arc::new(UserService::with_session_ttl(
        user_repo,
        session_repo,
        config.session.ttl_days,
    ));
    let newsletter_service = Arc::new(NewsletterService::new(newsletter_repo, email_service.clone()));
    let contact_service = Arc::new(ContactService::new(
        contact_repo,
        upload_service.clone(),
        newsletter_service.clone(),
        email_service.clone(),
    ));
    let room_service = Arc::new(RoomService::new(room_repo.clone(), cache.clone()));
    let booking_service = Arc::new(BookingService::new(booking_repo, room_repo));
    let event_service = Arc::new(EventService::new(event_repo, cache.clone()));
    let donation_service = Arc::new(DonationService::new(
        donation_repo,
        settings_repo.clone(),
        cache.clone(),
    ));
    let site_image_service = Arc::new(SiteImageService::new(image_repo, cache.clone()));
    let settings_service = Arc::new(SettingsService::new(settings_repo));

    let renderer = Arc::new(PageRenderer::new().context("Failed to load page templates")?);

    Ok(AppState {
        pool,
        cache,
        user_service,
        room_service,
        booking_service,
        event_service,
        contact_service,
        newsletter_service,
        donation_service,
        site_image_service,
        settings_service,
        upload_service,
        email_service,
        rate_limiter: Arc::new(LoginRateLimiter::new()),
        renderer,
        upload_config: Arc::new(config.upload.clone()),
        session_config: Arc::new(config.session.clone()),
        request_stats: Arc::new(RequestStats::new()),
    })
}

/// Start the hourly session purge and the rate-limiter cleanup
pub fn spawn_background_tasks(state: &AppState) {
    let users = state.user_service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = users.cleanup_expired_sessions().await {
                tracing::warn!("Session purge failed: {}", e);
            }
        }
    });

    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = limiter.cleanup().await;
            if removed > 0 {
                tracing::debug!(removed, "Rate limiter windows dropped");
            }
        }
    });
}
