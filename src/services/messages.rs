//! Message store: the chat history as one JSON array file.
//!
//! DESIGN
//! ======
//! Every append is a full read-modify-write: load the array, push, re-sort
//! by timestamp, write to a sibling temp file and rename it over the
//! original. Appends are serialized behind a process-wide async mutex so two
//! requests can never interleave their cycles and drop each other's message.
//! Reads take no lock: the rename swap means a reader sees either the old or
//! the new array, never a partial one.
//!
//! ERROR HANDLING
//! ==============
//! A file that does not parse is not an error for readers: `list` logs a
//! warning and returns an empty history. `append` moves the unreadable file
//! aside to `messages.json.corrupt.<uuid>` before writing, so the bad bytes
//! stay on disk for inspection. Every quarantine gets a fresh name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::message::{Message, sort_by_timestamp};

#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;

pub const MESSAGES_FILE: &str = "messages.json";

#[derive(Debug, thiserror::Error)]
pub enum MessageStoreError {
    #[error("message file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("message encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("message id '{0}' already exists")]
    DuplicateId(String),
}

pub struct MessageStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MessageStore {
    /// Store backed by `<data_dir>/messages.json`. Nothing touches the disk
    /// until the first operation.
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self { path: data_dir.as_ref().join(MESSAGES_FILE), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the data directory and an empty `[]` file if either is missing.
    /// An existing file is never rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub async fn ensure(&self) -> Result<(), MessageStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        match fs::OpenOptions::new().write(true).create_new(true).open(&self.path).await {
            Ok(mut file) => {
                file.write_all(b"[]").await?;
                file.flush().await?;
                info!(path = %self.path.display(), "created empty message file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// All messages, ascending by timestamp. A corrupt file yields an empty
    /// list.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures.
    pub async fn list(&self) -> Result<Vec<Message>, MessageStoreError> {
        self.ensure().await?;
        let raw = fs::read_to_string(&self.path).await?;
        match decode(&raw) {
            Ok(mut messages) => {
                sort_by_timestamp(&mut messages);
                Ok(messages)
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "message file is corrupt; serving empty history");
                Ok(Vec::new())
            }
        }
    }

    /// Append one message and persist the re-sorted history. Ids are unique:
    /// a message whose id is already stored is refused and nothing is written.
    ///
    /// # Errors
    ///
    /// `DuplicateId` for a reused id; otherwise the file could not be read,
    /// encoded or swapped in.
    pub async fn append(&self, message: Message) -> Result<Message, MessageStoreError> {
        let _guard = self.write_lock.lock().await;
        self.ensure().await?;

        let raw = fs::read_to_string(&self.path).await?;
        let mut messages = match decode(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                let moved_to = self.quarantine().await?;
                warn!(error = %e, moved_to = %moved_to.display(), "message file is corrupt; starting a new history");
                Vec::new()
            }
        };

        if messages.iter().any(|m| m.id == message.id) {
            return Err(MessageStoreError::DuplicateId(message.id));
        }

        messages.push(message.clone());
        sort_by_timestamp(&mut messages);
        self.write_all(&messages).await?;
        Ok(message)
    }

    async fn write_all(&self, messages: &[Message]) -> Result<(), MessageStoreError> {
        let bytes = serde_json::to_vec_pretty(messages)?;
        let tmp = sibling(&self.path, ".tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Move the unreadable file to `messages.json.corrupt.<uuid>`. Each
    /// quarantine gets its own name so earlier copies are never replaced.
    async fn quarantine(&self) -> Result<PathBuf, MessageStoreError> {
        let target = sibling(&self.path, &format!(".corrupt.{}", Uuid::new_v4()));
        fs::rename(&self.path, &target).await?;
        Ok(target)
    }
}

fn decode(raw: &str) -> Result<Vec<Message>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
