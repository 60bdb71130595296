//! Server-rendered pages
//!
//! Every page declares an [`Access`] level. The gate runs before any data is
//! loaded:
//! - no session on an `Authenticated` or `Admin` page: 303 to `/auth`
//! - a member on an `Admin` page: 303 to `/`
//!
//! Unknown paths render the 404 template.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use chrono::{Datelike, Utc};
use serde_json::{json, Value};

use crate::api::middleware::{AppState, CurrentUser};
use crate::models::User;

/// Where unauthenticated visitors are sent
pub const LOGIN_PATH: &str = "/auth";
/// Where members are sent when they reach an admin page
pub const HOME_PATH: &str = "/";

/// Number of events teased on the home page
const HOME_EVENT_COUNT: usize = 3;

/// Who may view a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

/// Decide whether `user` may see a page; `Some(path)` means redirect there
pub fn gate(access: Access, user: Option<&User>) -> Option<&'static str> {
    match (access, user) {
        (Access::Public, _) => None,
        (Access::Authenticated | Access::Admin, None) => Some(LOGIN_PATH),
        (Access::Authenticated, Some(_)) => None,
        (Access::Admin, Some(u)) if u.is_admin() => None,
        (Access::Admin, Some(_)) => Some(HOME_PATH),
    }
}

/// Failure while producing a page
#[derive(Debug)]
pub enum PageError {
    Redirect(&'static str),
    Internal(String),
}

impl PageError {
    fn internal(e: impl std::fmt::Display) -> Self {
        PageError::Internal(e.to_string())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Redirect(to) => Redirect::to(to).into_response(),
            PageError::Internal(msg) => {
                tracing::error!("Page rendering failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("<h1>Something went wrong</h1><p>Please try again later.</p>"),
                )
                    .into_response()
            }
        }
    }
}

type PageResult = Result<Response, PageError>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/events", get(events))
        .route("/rentals", get(rentals))
        .route("/fundraising", get(fundraising))
        .route("/contact", get(contact))
        .route("/auth", get(auth))
        .route("/booking", get(booking))
        .route("/profile", get(profile))
        .route("/admin", get(admin))
}

fn check(access: Access, user: &Option<User>) -> Result<(), PageError> {
    match gate(access, user.as_ref()) {
        Some(to) => Err(PageError::Redirect(to)),
        None => Ok(()),
    }
}

/// Render `template` with the shared layout context plus `data`
async fn render(
    state: &AppState,
    user: Option<User>,
    template: &str,
    path: &str,
    status: StatusCode,
    data: Value,
) -> PageResult {
    let site = state
        .settings_service
        .get_site_settings()
        .await
        .map_err(PageError::internal)?;
    let images = state
        .site_image_service
        .url_map()
        .await
        .map_err(PageError::internal)?;

    let mut context = json!({
        "site": site,
        "user": user,
        "images": images,
        "path": path,
        "year": Utc::now().year(),
    });
    if let (Some(base), Value::Object(extra)) = (context.as_object_mut(), data) {
        base.extend(extra);
    }

    let html = state
        .renderer
        .render(template, &context)
        .map_err(PageError::internal)?;
    Ok((status, Html(html)).into_response())
}

async fn home(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Public, &user)?;
    let mut events = state
        .event_service
        .list_public(false)
        .await
        .map_err(PageError::internal)?;
    events.truncate(HOME_EVENT_COUNT);
    let donations = state.donation_service.total().await.map_err(PageError::internal)?;

    let data = json!({
        "events": events,
        "donations": donations,
        "percent": donations.percent(),
    });
    render(&state, user, "home.html", "/", StatusCode::OK, data).await
}

async fn about(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Public, &user)?;
    render(&state, user, "about.html", "/about", StatusCode::OK, json!({})).await
}

async fn events(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Public, &user)?;
    let events = state
        .event_service
        .list_public(false)
        .await
        .map_err(PageError::internal)?;
    render(&state, user, "events.html", "/events", StatusCode::OK, json!({ "events": events })).await
}

async fn rentals(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Public, &user)?;
    let rooms = state.room_service.list().await.map_err(PageError::internal)?;
    render(&state, user, "rentals.html", "/rentals", StatusCode::OK, json!({ "rooms": rooms })).await
}

async fn fundraising(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Public, &user)?;
    let donations = state.donation_service.total().await.map_err(PageError::internal)?;
    let data = json!({ "donations": donations, "percent": donations.percent() });
    render(&state, user, "fundraising.html", "/fundraising", StatusCode::OK, data).await
}

async fn contact(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Public, &user)?;
    let data = json!({
        "max_attachments": state.upload_config.max_attachments,
        "max_file_mb": state.upload_config.max_file_size / (1024 * 1024),
        "accept": state.upload_config.allowed_types.join(","),
    });
    render(&state, user, "contact.html", "/contact", StatusCode::OK, data).await
}

async fn auth(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Public, &user)?;
    render(&state, user, "auth.html", "/auth", StatusCode::OK, json!({})).await
}

async fn booking(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Authenticated, &user)?;
    let rooms = state.room_service.list().await.map_err(PageError::internal)?;
    render(&state, user, "booking.html", "/booking", StatusCode::OK, json!({ "rooms": rooms })).await
}

async fn profile(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Authenticated, &user)?;
    let user_id = user.as_ref().map(|u| u.id).unwrap_or_default();
    let bookings = state
        .booking_service
        .list_for_user(user_id)
        .await
        .map_err(PageError::internal)?;
    render(&state, user, "profile.html", "/profile", StatusCode::OK, json!({ "bookings": bookings })).await
}

async fn admin(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    check(Access::Admin, &user)?;
    render(&state, user, "admin.html", "/admin", StatusCode::OK, json!({})).await
}

/// Fallback for unknown paths
pub async fn not_found(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    uri: Uri,
) -> PageResult {
    let path = uri.path().to_string();
    render(&state, user, "404.html", &path, StatusCode::NOT_FOUND, json!({})).await
}
