//! Chat message model and wire types shared by the server and the client.
//!
//! DESIGN
//! ======
//! `Message` is the stored and served shape. `NewMessage` is the loose body
//! accepted by `POST /messages`: every field optional so validation can report
//! the same errors for missing and empty values. The server fills `id` and
//! `timestamp` when the caller leaves them out.
//!
//! Timestamps stay strings on the wire. Ordering parses them on demand; a
//! value that does not parse sorts before every parseable one.

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use uuid::Uuid;

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

// =============================================================================
// TYPES
// =============================================================================

/// Media kind of a message. Serialized lowercase under the `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
}

impl MessageKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    /// Parse the wire name. Case-sensitive, like the stored values.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    /// Kind for a declared media type such as `image/png`. Text is never
    /// inferred; anything outside `image/*` and `audio/*` yields `None`.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let category = content_type.split('/').next().unwrap_or_default().trim();
        if category.eq_ignore_ascii_case("image") {
            Some(Self::Image)
        } else if category.eq_ignore_ascii_case("audio") {
            Some(Self::Audio)
        } else {
            None
        }
    }
}

/// One chat entry. `content` is raw text, or a URL for image/audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: String,
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Body returned by `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required fields: content, sender, type")]
    MissingFields,
    #[error("invalid type '{0}'; use text | image | audio")]
    InvalidKind(String),
    /// The server clock could not be rendered; not the caller's fault.
    #[error("failed to stamp message: {0}")]
    Timestamp(String),
}

// =============================================================================
// VALIDATION
// =============================================================================

impl NewMessage {
    /// Draft with the three required fields set.
    #[must_use]
    pub fn new(content: impl Into<String>, sender: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: None,
            content: Some(content.into()),
            sender: Some(sender.into()),
            kind: Some(kind.as_str().to_owned()),
            timestamp: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Validate required fields and fill server-assigned ones.
    ///
    /// # Errors
    ///
    /// `MissingFields` when `content`, `sender` or `type` is absent or empty,
    /// `InvalidKind` when `type` is not one of the three known kinds,
    /// `Timestamp` when the server time cannot be formatted.
    pub fn into_message(self) -> Result<Message, ValidationError> {
        let (Some(content), Some(sender), Some(kind)) =
            (non_empty(self.content), non_empty(self.sender), non_empty(self.kind))
        else {
            return Err(ValidationError::MissingFields);
        };
        let Some(kind) = MessageKind::parse(&kind) else {
            return Err(ValidationError::InvalidKind(kind));
        };

        let timestamp = match non_empty(self.timestamp) {
            Some(timestamp) => timestamp,
            None => now_timestamp().map_err(|e| ValidationError::Timestamp(e.to_string()))?,
        };

        Ok(Message {
            id: non_empty(self.id).unwrap_or_else(|| Uuid::new_v4().to_string()),
            content,
            sender,
            kind,
            timestamp,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// Wire format of server-assigned timestamps: UTC, millisecond precision.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// # Errors
///
/// Propagates the formatter's error.
pub fn now_timestamp() -> Result<String, time::error::Format> {
    format_timestamp(OffsetDateTime::now_utc())
}

/// # Errors
///
/// Propagates the formatter's error.
pub fn format_timestamp(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.to_offset(UtcOffset::UTC).format(TIMESTAMP_FORMAT)
}

/// Parse an ISO 8601 timestamp. Values with an offset (RFC 3339 included)
/// keep it; a date-time without one, or a bare date, is read as UTC.
/// `None` when no form fits.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(at);
    }
    if let Ok(at) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(at);
    }
    if let Ok(at) = PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(at.assume_utc());
    }
    if let Ok(day) = Date::parse(raw, &Iso8601::DEFAULT) {
        return Some(day.midnight().assume_utc());
    }
    None
}

/// Stable ascending sort by parsed timestamp.
pub fn sort_by_timestamp(messages: &mut [Message]) {
    messages.sort_by_cached_key(|m| parse_timestamp(&m.timestamp));
}
