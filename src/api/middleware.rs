//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type every handler returns
//! - Session token extraction (Bearer header first, then the `session` cookie)
//! - Authentication / admin authorization layers and extractors
//! - Request statistics

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::MemoryCache;
use crate::config::{SessionConfig, UploadConfig};
use crate::db::DynDatabasePool;
use crate::models::{Session, User};
use crate::services::{
    BookingError, BookingService, ContactError, ContactService, DonationError, DonationService,
    EmailService, EventError, EventService, LoginRateLimiter, NewsletterError, NewsletterService,
    RoomError, RoomService, SettingsService, SettingsServiceError, SiteImageError, SiteImageService,
    UploadError, UploadService, UserService, UserServiceError,
};
use crate::theme::PageRenderer;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Total response time in microseconds (for calculating average)
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.total_response_time_us.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub cache: Arc<MemoryCache>,
    pub user_service: Arc<UserService>,
    pub room_service: Arc<RoomService>,
    pub booking_service: Arc<BookingService>,
    pub event_service: Arc<EventService>,
    pub contact_service: Arc<ContactService>,
    pub newsletter_service: Arc<NewsletterService>,
    pub donation_service: Arc<DonationService>,
    pub site_image_service: Arc<SiteImageService>,
    pub settings_service: Arc<SettingsService>,
    pub upload_service: Arc<UploadService>,
    pub email_service: Arc<EmailService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub renderer: Arc<PageRenderer>,
    pub upload_config: Arc<UploadConfig>,
    pub session_config: Arc<SessionConfig>,
    pub request_stats: Arc<RequestStats>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The logged-in user, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new("PAYLOAD_TOO_LARGE", message)
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::new("UNSUPPORTED_MEDIA_TYPE", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::with_details(
            "RATE_LIMIT",
            message,
            serde_json::json!({ "retry_after": retry_after_secs }),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the real cause and hand the client a generic message
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::internal_error("Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            "UNSUPPORTED_MEDIA_TYPE" => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::NotFound => ApiError::not_found("User not found"),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::UnsupportedType(_) => ApiError::unsupported_media_type(e.to_string()),
            UploadError::TooLarge { .. } => ApiError::payload_too_large(e.to_string()),
            UploadError::Empty => ApiError::validation_error(e.to_string()),
            UploadError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<ContactError> for ApiError {
    fn from(e: ContactError) -> Self {
        match e {
            ContactError::ValidationError(msg) => ApiError::validation_error(msg),
            ContactError::NotFound => ApiError::not_found("Message not found"),
            ContactError::Upload(e) => e.into(),
            ContactError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<NewsletterError> for ApiError {
    fn from(e: NewsletterError) -> Self {
        match e {
            NewsletterError::ValidationError(msg) => ApiError::validation_error(msg),
            NewsletterError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(e: RoomError) -> Self {
        match e {
            RoomError::ValidationError(msg) => ApiError::validation_error(msg),
            RoomError::NotFound => ApiError::not_found("Room not found"),
            RoomError::DuplicateName(_) => ApiError::conflict(e.to_string()),
            RoomError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::ValidationError(msg) => ApiError::validation_error(msg),
            BookingError::RoomNotFound => ApiError::not_found("Room not found"),
            BookingError::NotFound => ApiError::not_found("Booking not found"),
            BookingError::Conflict => ApiError::conflict(e.to_string()),
            BookingError::Forbidden(msg) => ApiError::forbidden(msg),
            BookingError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<EventError> for ApiError {
    fn from(e: EventError) -> Self {
        match e {
            EventError::ValidationError(msg) => ApiError::validation_error(msg),
            EventError::NotFound => ApiError::not_found("Event not found"),
            EventError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<DonationError> for ApiError {
    fn from(e: DonationError) -> Self {
        match e {
            DonationError::ValidationError(msg) => ApiError::validation_error(msg),
            DonationError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<SiteImageError> for ApiError {
    fn from(e: SiteImageError) -> Self {
        match e {
            SiteImageError::ValidationError(msg) => ApiError::validation_error(msg),
            SiteImageError::NotFound => ApiError::not_found("Image not found"),
            SiteImageError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<SettingsServiceError> for ApiError {
    fn from(e: SettingsServiceError) -> Self {
        match e {
            SettingsServiceError::InvalidValue(msg) => ApiError::validation_error(msg),
            SettingsServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// Extract session token from request headers
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    for value in headers.get_all(header::COOKIE) {
        let Ok(cookie_str) = value.to_str() else {
            continue;
        };
        for cookie in cookie_str.split(';') {
            if let Some((name, token)) = cookie.trim().split_once('=') {
                if name == SESSION_COOKIE && !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Client address as reported by a reverse proxy
pub fn extract_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next().and_then(|s| s.trim().parse().ok()) {
            return Some(ip);
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// `Set-Cookie` value that stores the session token
pub fn session_cookie(session: &Session, config: &SessionConfig) -> HeaderValue {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        session.max_age_seconds()
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    // Session ids are UUIDs, always a valid header value
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    Ok(state.user_service.validate_session(&token).await?)
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_user(&state, request.headers())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware; used in front of the HTML pages
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_user(&state, request.headers()).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Session lookup failed: {}", e.error.message),
    }
    next.run(request).await
}

/// Admin authorization middleware. Must run after `require_auth`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

/// Request statistics middleware
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
