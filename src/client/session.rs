//! One user's chat session: send paths plus the shared timeline.
//!
//! Every send first adds an optimistic entry with a client-generated id,
//! then posts with that id so the server stores the message under it. The
//! entry is marked sent or failed when the request resolves; polling
//! confirms it once a snapshot contains the id.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{info, warn};
use uuid::Uuid;

use super::api::{ApiClient, ClientError};
use super::poller::{self, MessageSource, PollerHandle};
use super::timeline::{Timeline, TimelineEntry};
use crate::message::{Message, MessageKind, NewMessage, UploadResponse, now_timestamp};

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

pub const MAX_USER_NAME_CHARS: usize = 40;
pub const MAX_TEXT_CHARS: usize = 200;

pub struct ChatSession {
    api: ApiClient,
    user: String,
    timeline: Arc<Mutex<Timeline>>,
    changes: watch::Sender<u64>,
}

impl ChatSession {
    /// # Errors
    ///
    /// Returns `Invalid` if the user name is blank or too long.
    pub fn new(api: ApiClient, user: &str) -> Result<Self, ClientError> {
        let user = validate_user_name(user)?;
        let (changes, _) = watch::channel(0);
        Ok(Self { api, user, timeline: Arc::new(Mutex::new(Timeline::new())), changes })
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Receives the timeline revision after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub async fn entries(&self) -> Vec<TimelineEntry> {
        self.timeline.lock().await.entries()
    }

    /// Poll every `interval` until the handle is dropped.
    #[must_use]
    pub fn start_polling(&self, interval: Duration) -> PollerHandle {
        let source: Arc<dyn MessageSource> = Arc::new(self.api.clone());
        poller::spawn_poller(source, Arc::clone(&self.timeline), interval, self.changes.clone())
    }

    /// One fetch outside the poll schedule.
    pub async fn refresh(&self) {
        let source: Arc<dyn MessageSource> = Arc::new(self.api.clone());
        poller::poll_once(source, Arc::clone(&self.timeline), self.changes.clone()).await;
    }

    /// # Errors
    ///
    /// `Invalid` for blank or overlong text; otherwise the post's error.
    pub async fn send_text(&self, text: &str) -> Result<Message, ClientError> {
        let text = validate_text(text)?;
        let pending = self.begin(text, MessageKind::Text).await?;

        let draft = NewMessage::new(pending.content.clone(), self.user.clone(), MessageKind::Text).with_id(&pending.id);
        let result = self.api.post_message(&draft).await;
        self.finish(&pending.id, result).await
    }

    /// Upload a blob, then post a message pointing at it. The kind comes
    /// from the declared `content_type`, independent of the server's
    /// extension check.
    ///
    /// # Errors
    ///
    /// `Invalid` when `content_type` is neither image nor audio; otherwise
    /// the upload's or post's error.
    pub async fn send_file(&self, bytes: Vec<u8>, file_name: &str, content_type: &str) -> Result<Message, ClientError> {
        let kind = MessageKind::from_content_type(content_type)
            .ok_or_else(|| ClientError::Invalid(format!("unsupported file type '{content_type}'")))?;
        let pending = self.begin(file_name.to_owned(), kind).await?;

        let result: Result<Message, ClientError> = async {
            let UploadResponse { url } = self.api.upload_file(bytes, file_name, content_type).await?;
            let draft = NewMessage::new(url, self.user.clone(), kind).with_id(&pending.id);
            self.api.post_message(&draft).await
        }
        .await;
        self.finish(&pending.id, result).await
    }

    /// Remove a local entry (typically a failed send).
    pub async fn discard(&self, id: &str) -> bool {
        self.update(|t| t.discard(id)).await
    }

    async fn begin(&self, content: String, kind: MessageKind) -> Result<Message, ClientError> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            content,
            sender: self.user.clone(),
            kind,
            timestamp: now_timestamp()?,
        };
        let pending = message.clone();
        self.update(move |t| t.push_pending(pending)).await;
        Ok(message)
    }

    async fn finish(&self, id: &str, result: Result<Message, ClientError>) -> Result<Message, ClientError> {
        match &result {
            Ok(stored) => {
                info!(id, kind = stored.kind.as_str(), "message sent");
                let stored = stored.clone();
                self.update(move |t| t.mark_sent(id, stored)).await;
            }
            Err(e) => {
                warn!(id, error = %e, "message send failed");
                let reason = e.to_string();
                self.update(move |t| t.mark_failed(id, reason)).await;
            }
        }
        result
    }

    async fn update(&self, apply: impl FnOnce(&mut Timeline) -> bool) -> bool {
        let mut timeline = self.timeline.lock().await;
        let changed = apply(&mut timeline);
        if changed {
            let revision = timeline.revision();
            self.changes.send_modify(|current| *current = revision);
        }
        changed
    }
}

// =============================================================================
// INPUT RULES
// =============================================================================

/// Trimmed, non-empty, at most [`MAX_USER_NAME_CHARS`] characters.
///
/// # Errors
///
/// Returns `Invalid` describing the violated rule.
pub fn validate_user_name(raw: &str) -> Result<String, ClientError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ClientError::Invalid("please enter your name".into()));
    }
    if name.chars().count() > MAX_USER_NAME_CHARS {
        return Err(ClientError::Invalid(format!("name is longer than {MAX_USER_NAME_CHARS} characters")));
    }
    Ok(name.to_owned())
}

/// Trimmed, non-empty, at most [`MAX_TEXT_CHARS`] characters.
///
/// # Errors
///
/// Returns `Invalid` describing the violated rule.
pub fn validate_text(raw: &str) -> Result<String, ClientError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ClientError::Invalid("message is empty".into()));
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ClientError::Invalid(format!("message is longer than {MAX_TEXT_CHARS} characters")));
    }
    Ok(text.to_owned())
}

/// Declared media type for a file name, the way a browser would label it.
#[must_use]
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}
