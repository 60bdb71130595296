//! Upload API endpoints
//!
//! - POST /api/upload - Store a single file from the multipart field `file`
//!
//! Also holds the multipart helpers shared with the contact form.

use axum::{
    extract::{multipart::Field, multipart::MultipartError, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::{PendingAttachment, StoredFile};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub fn router() -> Router<AppState> {
    Router::new().route("/upload", post(upload_file))
}

/// POST /api/upload
async fn upload_file(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<StoredFile>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let file = read_file_field(field).await?;
        let stored = state
            .upload_service
            .store(&file.file_name, &file.content_type, &file.data)
            .await?;

        tracing::info!(user_id = user.0.id, url = %stored.url, "File uploaded");
        return Ok(Json(stored));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// Buffer a file part in memory
pub async fn read_file_field(field: Field<'_>) -> Result<PendingAttachment, ApiError> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string();
    let data = field.bytes().await.map_err(multipart_error)?;

    Ok(PendingAttachment {
        file_name,
        content_type,
        data: data.to_vec(),
    })
}

/// Map a multipart read failure; an exceeded body limit becomes 413
pub fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Request body is too large")
    } else {
        ApiError::validation_error(format!("Invalid multipart body: {}", e.body_text()))
    }
}
