//! Upload store: media blobs on disk under generated names.
//!
//! Each accepted upload is written once as `<uuid>.<ext>` and never touched
//! again. The original file name only contributes its extension, which must
//! be on the allow-list, so a client-chosen name can never steer the write
//! outside the upload directory.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;
use uuid::Uuid;

#[cfg(test)]
#[path = "uploads_test.rs"]
mod tests;

/// Extensions accepted for upload, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "mp3", "wav"];

/// 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// URL path the blob directory is served under.
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file type not allowed: '{0}'. Use jpg/jpeg/png/gif/mp3/wav.")]
    NotAllowed(String),
    #[error("file too large (limit {limit} bytes)")]
    TooLarge { limit: usize },
    #[error("upload I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub struct UploadStore {
    dir: PathBuf,
    public_base: String,
    max_bytes: usize,
}

impl UploadStore {
    /// `public_base` is joined with stored names by [`UploadStore::url_for`],
    /// e.g. `/uploads` or `https://chat.example/uploads`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, public_base: impl Into<String>, max_bytes: usize) -> Self {
        let public_base = public_base.into().trim_end_matches('/').to_owned();
        Self { dir: dir.into(), public_base, max_bytes }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Write `bytes` under a fresh name that keeps the original extension.
    ///
    /// # Errors
    ///
    /// `NotAllowed` for an extension outside the allow-list, `TooLarge` past
    /// the size limit, `Io` if the blob cannot be written.
    pub async fn save(&self, bytes: &[u8], original_name: &str) -> Result<String, UploadError> {
        let ext = allowed_extension(original_name)?;
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge { limit: self.max_bytes });
        }

        fs::create_dir_all(&self.dir).await?;
        let stored_name = format!("{}.{ext}", Uuid::new_v4());
        fs::write(self.dir.join(&stored_name), bytes).await?;

        info!(%stored_name, original_name, size = bytes.len(), "upload stored");
        Ok(stored_name)
    }

    /// Public URL of a stored blob. Does not check that it exists.
    #[must_use]
    pub fn url_for(&self, stored_name: &str) -> String {
        format!("{}/{stored_name}", self.public_base)
    }
}

/// Extension of `name` (as written) if it is on the allow-list.
///
/// # Errors
///
/// Returns `NotAllowed` when the name has no extension or an unlisted one.
pub fn allowed_extension(name: &str) -> Result<&str, UploadError> {
    match name.rsplit_once('.') {
        Some((_, ext)) if ALLOWED_EXTENSIONS.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)) => Ok(ext),
        _ => Err(UploadError::NotAllowed(name.to_owned())),
    }
}
