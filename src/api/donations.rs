//! Donation endpoints
//!
//! Public:
//! - GET /api/donations/total - `{total, goal}` in currency units
//! - POST /api/donations - Record a pledge
//!
//! Admin:
//! - GET /api/admin/donations
//! - PUT /api/admin/donations/goal

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateDonationInput, Donation, DonationsTotal, PagedResult};

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub goal: f64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/donations", post(donate))
        .route("/donations/total", get(total))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/donations", get(list_donations))
        .route("/donations/goal", put(set_goal))
}

async fn total(State(state): State<AppState>) -> Result<Json<DonationsTotal>, ApiError> {
    Ok(Json(state.donation_service.total().await?))
}

async fn donate(
    State(state): State<AppState>,
    Json(body): Json<CreateDonationInput>,
) -> Result<(StatusCode, Json<Donation>), ApiError> {
    let donation = state.donation_service.donate(body).await?;
    Ok((StatusCode::CREATED, Json(donation)))
}

async fn list_donations(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<Donation>>, ApiError> {
    let (page, per_page) = query.normalized();
    let result = state.donation_service.list(page, per_page).await?;
    Ok(Json(query.into_page(result)))
}

async fn set_goal(
    State(state): State<AppState>,
    Json(body): Json<GoalRequest>,
) -> Result<Json<DonationsTotal>, ApiError> {
    Ok(Json(state.donation_service.set_goal(body.goal).await?))
}
