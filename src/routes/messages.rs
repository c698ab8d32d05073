//! Message list and post routes.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Json;
use tracing::info;

use super::ApiError;
use crate::message::{Message, NewMessage};
use crate::state::AppState;

/// `GET /messages`: full history, ascending by timestamp.
pub async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state
        .messages
        .list()
        .await
        .map_err(|e| ApiError::internal("failed to read messages", e))?;
    Ok(Json(messages))
}

/// `POST /messages`: validate, fill `id`/`timestamp`, append. A reused
/// `id` is a 409.
pub async fn create_message(
    State(state): State<AppState>,
    body: Result<Json<NewMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let Json(draft) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let message = draft.into_message()?;

    let stored = state.messages.append(message).await?;

    info!(id = %stored.id, sender = %stored.sender, kind = stored.kind.as_str(), "message stored");
    Ok((StatusCode::CREATED, Json(stored)))
}
