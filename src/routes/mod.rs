//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API and the static blob directory under a
//! single Axum router. Handlers validate input, call one store, and map the
//! outcome to a status code. Every error body is `{"error": "<message>"}`.

pub mod messages;
pub mod upload;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::message::ValidationError;
use crate::services::messages::MessageStoreError;
use crate::services::uploads::{UPLOADS_ROUTE, UploadError};
use crate::state::AppState;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Slack on top of the blob limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.uploads.max_bytes().saturating_add(MULTIPART_OVERHEAD_BYTES);
    let blobs = ServeDir::new(state.uploads.dir());

    Router::new()
        .route("/", get(health))
        .route("/messages", get(messages::list_messages).post(messages::create_message))
        .route("/upload", post(upload::upload_file))
        .nest_service(UPLOADS_ROUTE, blobs)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true, "message": "Backend running" }))
}

// =============================================================================
// ERRORS
// =============================================================================

/// Handler failure. Client mistakes carry their message through; server
/// faults are logged where they happen and answered with a fixed message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log `err` and produce a generic 500.
    pub(crate) fn internal(message: &'static str, err: impl std::fmt::Display) -> Self {
        error!(error = %err, "{message}");
        Self::Internal(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Timestamp(e) => Self::internal("failed to stamp message", e),
            ValidationError::MissingFields | ValidationError::InvalidKind(_) => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<MessageStoreError> for ApiError {
    fn from(err: MessageStoreError) -> Self {
        match err {
            MessageStoreError::DuplicateId(_) => Self::Conflict(err.to_string()),
            MessageStoreError::Io(_) | MessageStoreError::Encode(_) => Self::internal("failed to save message", err),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NotAllowed(_) | UploadError::TooLarge { .. } => Self::BadRequest(err.to_string()),
            UploadError::Io(e) => Self::internal("upload failed", e),
        }
    }
}
