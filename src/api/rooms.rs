//! Room endpoints
//!
//! Public:
//! - GET /api/rooms
//! - GET /api/rooms/{id}
//!
//! Admin:
//! - POST /api/admin/rooms
//! - PUT /api/admin/rooms/{id}
//! - DELETE /api/admin/rooms/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Room, RoomInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/{id}", get(get_room))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{id}", put(update_room).delete(delete_room))
}

async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(state.room_service.list().await?))
}

async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Room>, ApiError> {
    Ok(Json(state.room_service.get(id).await?))
}

async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<RoomInput>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    let room = state.room_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<RoomInput>,
) -> Result<Json<Room>, ApiError> {
    Ok(Json(state.room_service.update(id, body).await?))
}

async fn delete_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.room_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
