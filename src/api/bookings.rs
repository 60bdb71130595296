//! Booking endpoints
//!
//! Authenticated:
//! - POST /api/bookings - Request a booking
//! - GET /api/bookings/mine - The caller's bookings
//! - POST /api/bookings/{id}/cancel - Cancel one of the caller's bookings
//!
//! Admin:
//! - GET /api/admin/bookings?status=&page=&per_page=
//! - PUT /api/admin/bookings/{id}/status

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;

use crate::api::common::{default_page, default_per_page, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Booking, BookingStatus, CreateBookingInput, PagedResult};

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/mine", get(my_bookings))
        .route("/bookings/{id}/cancel", post(cancel_booking))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings))
        .route("/bookings/{id}/status", put(update_status))
}

/// POST /api/bookings
async fn create_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateBookingInput>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let booking = state.booking_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn my_bookings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(state.booking_service.list_for_user(user.0.id).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.booking_service.cancel_own(&user.0, id).await?))
}

/// GET /api/admin/bookings
async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<PagedResult<Booking>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            BookingStatus::from_str(s).map_err(|e| ApiError::validation_error(e.to_string()))?,
        ),
    };

    let pagination = PaginationQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let (page, per_page) = pagination.normalized();
    let result = state.booking_service.list(status, page, per_page).await?;
    Ok(Json(pagination.into_page(result)))
}

/// PUT /api/admin/bookings/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state.booking_service.set_status(id, body.status).await?;
    tracing::info!(booking_id = id, status = %booking.status, "Booking status changed");
    Ok(Json(booking))
}
