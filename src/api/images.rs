//! Site image endpoints
//!
//! - GET /api/images - `{key: url}` for every assigned slot
//! - GET /api/admin/images - Full records, admin only
//! - PUT /api/admin/images/{key} - Assign an image to a slot
//! - DELETE /api/admin/images/{key}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::api::middleware::{ApiError, AppState};
use crate::models::SiteImage;

#[derive(Debug, Deserialize)]
pub struct SetImageRequest {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/images", get(image_map))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/images", get(list_images))
        .route("/images/{key}", put(set_image).delete(delete_image))
}

async fn image_map(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    Ok(Json(state.site_image_service.url_map().await?))
}

async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<SiteImage>>, ApiError> {
    Ok(Json(state.site_image_service.list().await?))
}

async fn set_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<SetImageRequest>,
) -> Result<Json<SiteImage>, ApiError> {
    let image = state
        .site_image_service
        .set(&key, &body.url, body.alt_text)
        .await?;
    Ok(Json(image))
}

async fn delete_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.site_image_service.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
