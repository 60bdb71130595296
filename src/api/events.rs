//! Event endpoints
//!
//! Public:
//! - GET /api/events?all=true
//! - GET /api/events/{id}
//!
//! Admin:
//! - GET/POST /api/admin/events
//! - PUT/DELETE /api/admin/events/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Event, EventInput};

#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    /// Include events that have already finished
    #[serde(default)]
    pub all: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{id}", get(get_event))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_all_events).post(create_event))
        .route("/events/{id}", axum::routing::put(update_event).delete(delete_event))
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.event_service.list_public(query.all).await?))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(state.event_service.get_public(id).await?))
}

async fn list_all_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.event_service.list_all().await?))
}

async fn create_event(
    State(state): State<AppState>,
    Json(body): Json<EventInput>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state.event_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<EventInput>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(state.event_service.update(id, body).await?))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.event_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
