//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the two stores behind `Arc` so every clone addresses the same
//! message file lock and upload directory.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::messages::MessageStore;
use crate::services::uploads::UploadStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<MessageStore>,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    #[must_use]
    pub fn new(messages: MessageStore, uploads: UploadStore) -> Self {
        Self { messages: Arc::new(messages), uploads: Arc::new(uploads) }
    }

    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            MessageStore::new(&config.data_dir),
            UploadStore::new(&config.uploads_dir, config.uploads_public_base(), config.max_upload_bytes),
        )
    }
}

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
