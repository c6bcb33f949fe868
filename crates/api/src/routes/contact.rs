//! Contact form route handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::instrument;

use souk_core::{Contact, NewContact};

use super::JsonBody;
use crate::db::ContactRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Response for a stored submission.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub message: &'static str,
    pub contact: Contact,
}

/// Store a contact form submission.
///
/// POST /api/contact
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<NewContact>,
) -> Result<(StatusCode, Json<ContactResponse>)> {
    let contact = form
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let contact = ContactRepository::new(state.pool()).create(&contact).await?;
    tracing::info!(contact_id = %contact.id, "Contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            message: "Message sent successfully",
            contact,
        }),
    ))
}
