//! REST API client for the chat backend.
//!
//! ERROR HANDLING
//! ==============
//! Any non-success response becomes `ClientError::Status` whose display text
//! is the response body, so callers can surface the server's own message.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use crate::message::{Message, NewMessage, UploadResponse};
use crate::routes::upload::FILE_FIELD;

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{body}")]
    Status { status: u16, body: String },
    #[error("file read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Invalid(String),
    #[error("timestamp format failed: {0}")]
    Timestamp(#[from] time::error::Format),
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Client with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET /` liveness probe.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses.
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let resp = self.http.get(self.url("/")).send().await?;
        decode(resp).await
    }

    /// `GET /messages`.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses.
    pub async fn fetch_messages(&self) -> Result<Vec<Message>, ClientError> {
        let resp = self.http.get(self.url("/messages")).send().await?;
        decode(resp).await
    }

    /// `POST /messages`.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses (400 on validation).
    pub async fn post_message(&self, draft: &NewMessage) -> Result<Message, ClientError> {
        let resp = self.http.post(self.url("/messages")).json(draft).send().await?;
        decode(resp).await
    }

    /// `POST /upload` with the bytes as the multipart `file` field.
    ///
    /// # Errors
    ///
    /// Transport failures, an unparsable `content_type`, and non-success
    /// statuses (400 on disallowed type or size).
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> Result<UploadResponse, ClientError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str(content_type)?;
        let form = Form::new().part(FILE_FIELD, part);
        let resp = self.http.post(self.url("/upload")).multipart(form).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await?;
        let body = if body.is_empty() { status.to_string() } else { body };
        return Err(ClientError::Status { status: status.as_u16(), body });
    }
    Ok(resp.json::<T>().await?)
}
