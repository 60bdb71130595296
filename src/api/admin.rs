//! Admin API endpoints
//!
//! Back-office operations not owned by a single resource module:
//! - GET /api/admin/stats - Dashboard counters
//! - GET /api/admin/users, PUT /api/admin/users/{id}/role, DELETE /api/admin/users/{id}
//! - GET /api/admin/messages, DELETE /api/admin/messages/{id}
//! - GET /api/admin/newsletter/subscribers, GET /api/admin/newsletter/issues,
//!   POST /api/admin/newsletter/send
//! - GET/PUT /api/admin/settings
//! - POST /api/admin/cache/clear
//!
//! Every route here sits behind `require_auth` + `require_admin`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::{bookings, donations, events, images, rooms};
use crate::models::{
    BookingStatus, ContactMessage, DonationsTotal, Newsletter, NewsletterSubscriber, PagedResult,
    User, UserRole,
};
use crate::services::SiteSettings;

/// Dashboard counters
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub admins: i64,
    pub rooms: i64,
    pub events: i64,
    pub bookings_pending: i64,
    pub bookings_confirmed: i64,
    pub messages: i64,
    pub subscribers: i64,
    pub donations: DonationsTotal,
    pub system: SystemStats,
}

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
    pub cache_entries: u64,
    pub emails_sent: u64,
    pub email_log_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct SendNewsletterRequest {
    pub subject: String,
    /// Markdown source
    pub body: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/role", put(set_role))
        .route("/messages", get(list_messages))
        .route("/messages/{id}", delete(delete_message))
        .route("/newsletter/subscribers", get(list_subscribers))
        .route("/newsletter/issues", get(list_issues))
        .route("/newsletter/send", post(send_newsletter))
        .route("/settings", get(get_settings).put(update_settings))
        .route("/cache/clear", post(clear_cache))
        .merge(rooms::admin_router())
        .merge(bookings::admin_router())
        .merge(events::admin_router())
        .merge(donations::admin_router())
        .merge(images::admin_router())
}

/// GET /api/admin/stats
async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = &state.request_stats;

    Ok(Json(StatsResponse {
        users: state.user_service.count().await?,
        admins: state.user_service.count_admins().await?,
        rooms: state.room_service.count().await?,
        events: state.event_service.count().await?,
        bookings_pending: state.booking_service.count_by_status(BookingStatus::Pending).await?,
        bookings_confirmed: state.booking_service.count_by_status(BookingStatus::Confirmed).await?,
        messages: state.contact_service.count().await?,
        subscribers: state.newsletter_service.count_subscribers().await?,
        donations: state.donation_service.total().await?,
        system: SystemStats {
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: stats.uptime_seconds(),
            total_requests: stats.total_requests(),
            avg_response_time_ms: stats.avg_response_time_us() / 1000.0,
            cache_entries: state.cache.entry_count(),
            emails_sent: state.email_service.sent_count(),
            email_log_only: state.email_service.is_log_only(),
        },
    }))
}

/// GET /api/admin/users
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    let (page, per_page) = query.normalized();
    let result = state.user_service.list_users(page, per_page).await?;
    Ok(Json(query.into_page(result)))
}

/// PUT /api/admin/users/{id}/role
async fn set_role(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state.user_service.set_role(admin.0.id, id, body.role).await?;
    tracing::info!(admin_id = admin.0.id, user_id = id, role = %user.role, "User role changed");
    Ok(Json(user))
}

/// DELETE /api/admin/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete_user(admin.0.id, id).await?;
    tracing::info!(admin_id = admin.0.id, user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/messages
async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<ContactMessage>>, ApiError> {
    let (page, per_page) = query.normalized();
    let result = state.contact_service.list(page, per_page).await?;
    Ok(Json(query.into_page(result)))
}

/// DELETE /api/admin/messages/{id}
async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.contact_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subscribers(
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsletterSubscriber>>, ApiError> {
    Ok(Json(state.newsletter_service.list_subscribers().await?))
}

async fn list_issues(State(state): State<AppState>) -> Result<Json<Vec<Newsletter>>, ApiError> {
    Ok(Json(state.newsletter_service.list_issues().await?))
}

/// POST /api/admin/newsletter/send
async fn send_newsletter(
    State(state): State<AppState>,
    Json(body): Json<SendNewsletterRequest>,
) -> Result<Json<Newsletter>, ApiError> {
    let issue = state
        .newsletter_service
        .send(&body.subject, &body.body)
        .await?;
    Ok(Json(issue))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<SiteSettings>, ApiError> {
    Ok(Json(state.settings_service.get_site_settings().await?))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<SiteSettings>,
) -> Result<Json<SiteSettings>, ApiError> {
    Ok(Json(state.settings_service.update_site_settings(&body).await?))
}

/// POST /api/admin/cache/clear
async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.cache.clear().await;
    tracing::info!("Query cache cleared");
    StatusCode::NO_CONTENT
}
