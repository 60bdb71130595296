//! Health check
//!
//! GET /health - `{status, database, version}`; 503 when the database is unreachable

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::middleware::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (status, database, code) = match state.pool.ping().await {
        Ok(()) => ("ok", "ok", StatusCode::OK),
        Err(e) => {
            tracing::error!("Health check database ping failed: {}", e);
            ("degraded", "error", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
