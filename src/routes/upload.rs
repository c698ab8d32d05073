//! Media upload route.
//!
//! The extension is checked before the body is read, and the size limit is
//! enforced chunk by chunk, so a rejected upload never lands on disk.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Json;

use super::ApiError;
use crate::message::UploadResponse;
use crate::services::uploads::{UploadError, allowed_extension};
use crate::state::AppState;

/// Multipart field carrying the blob.
pub const FILE_FIELD: &str = "file";

/// `POST /upload`: store the `file` field and return its public URL.
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = state.uploads.max_bytes();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| multipart_error(e, limit))? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_owned();
        allowed_extension(&original_name)?;
        let bytes = read_limited(&mut field, limit).await?;

        let stored_name = state.uploads.save(&bytes, &original_name).await?;
        let url = absolute_url(state.uploads.url_for(&stored_name), &headers);
        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(ApiError::BadRequest("no file uploaded".into()))
}

async fn read_limited(field: &mut Field<'_>, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        if bytes.len() + chunk.len() > limit {
            return Err(UploadError::TooLarge { limit }.into());
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { limit }.into()
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Prefix a path-only URL with `http://<Host>`. Absolute URLs (configured
/// public origin) pass through.
fn absolute_url(url: String, headers: &HeaderMap) -> String {
    if !url.starts_with('/') {
        return url;
    }
    match headers.get(header::HOST).map(|h| h.to_str()) {
        Some(Ok(host)) => format!("http://{host}{url}"),
        _ => url,
    }
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;
