//! Contact form endpoint
//!
//! POST /api/contact accepts either JSON `{name, email, subject, message,
//! newsletter}` or multipart with the same text fields plus any number of
//! `attachments` file parts.

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    routing::post,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::upload::{multipart_error, read_file_field};
use crate::models::{ContactInput, ContactMessage};
use crate::services::PendingAttachment;

pub fn router() -> Router<AppState> {
    Router::new().route("/contact", post(submit))
}

/// POST /api/contact
async fn submit(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ContactMessage>, ApiError> {
    let (input, attachments) = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::validation_error(e.body_text()))?;
        read_multipart_form(multipart).await?
    } else {
        let Json(input) = Json::<ContactInput>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::validation_error(e.body_text()))?;
        (input, Vec::new())
    };

    let message = state.contact_service.submit(input, attachments).await?;
    Ok(Json(message))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

async fn read_multipart_form(
    mut multipart: Multipart,
) -> Result<(ContactInput, Vec<PendingAttachment>), ApiError> {
    let mut input = ContactInput::default();
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "attachments" || name == "attachments[]" {
            // Browsers send an empty part when no file was chosen
            let file = read_file_field(field).await?;
            if !file.data.is_empty() {
                attachments.push(file);
            }
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "name" => input.name = value,
            "email" => input.email = value,
            "subject" => input.subject = value,
            "message" => input.message = value,
            "newsletter" => input.newsletter = is_checked(&value),
            _ => {}
        }
    }

    Ok((input, attachments))
}

/// Checkbox values as browsers and scripts send them
fn is_checked(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "on" | "1" | "yes")
}
