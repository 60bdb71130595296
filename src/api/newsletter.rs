//! Newsletter subscription endpoints
//!
//! - POST /api/newsletter/subscribe - Idempotent subscribe
//! - POST /api/newsletter/unsubscribe - Always 200

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::services::SubscribeOutcome;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub unsubscribed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/newsletter/subscribe", post(subscribe))
        .route("/newsletter/unsubscribe", post(unsubscribe))
}

async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<SubscribeOutcome>, ApiError> {
    Ok(Json(state.newsletter_service.subscribe(&body.email).await?))
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<UnsubscribeResponse>, ApiError> {
    let removed = state.newsletter_service.unsubscribe(&body.email).await?;
    Ok(Json(UnsubscribeResponse { unsubscribed: removed }))
}
