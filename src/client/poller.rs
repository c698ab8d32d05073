//! Repeating fetch task feeding a shared [`Timeline`].
//!
//! DESIGN
//! ======
//! The first tick fires immediately (the initial load), then every
//! `interval`. Each tick spawns its own fetch so a hung request never holds
//! up the next one; the timeline's sequence check discards whichever result
//! arrives out of order. Missed ticks are skipped rather than bunched.
//!
//! The task and every fetch it spawned are aborted when the `PollerHandle`
//! is dropped, tying polling to the lifetime of whatever view owns it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::api::{ApiClient, ClientError};
use super::timeline::Timeline;
use crate::message::Message;

#[cfg(test)]
#[path = "poller_test.rs"]
mod tests;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Where snapshots come from. `ApiClient` in production.
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_messages(&self) -> Result<Vec<Message>, ClientError>;
}

#[async_trait::async_trait]
impl MessageSource for ApiClient {
    async fn fetch_messages(&self) -> Result<Vec<Message>, ClientError> {
        ApiClient::fetch_messages(self).await
    }
}

/// Owns the polling task. Dropping it stops polling.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(self) {
        drop(self);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start polling `source` into `timeline`. `changes` receives the timeline
/// revision after every fetch that altered it.
pub fn spawn_poller(
    source: Arc<dyn MessageSource>,
    timeline: Arc<Mutex<Timeline>>,
    interval: Duration,
    changes: watch::Sender<u64>,
) -> PollerHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    in_flight.spawn(poll_once(Arc::clone(&source), Arc::clone(&timeline), changes.clone()));
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }
    });
    PollerHandle { task }
}

/// One fetch-and-apply cycle. Errors are logged; the next tick retries.
pub async fn poll_once(source: Arc<dyn MessageSource>, timeline: Arc<Mutex<Timeline>>, changes: watch::Sender<u64>) {
    let seq = timeline.lock().await.begin_fetch();
    match source.fetch_messages().await {
        Ok(remote) => {
            let mut timeline = timeline.lock().await;
            if timeline.apply_remote(seq, remote) {
                let revision = timeline.revision();
                changes.send_modify(|current| *current = revision);
            } else {
                debug!(seq, "poll brought no changes");
            }
        }
        Err(e) => warn!(error = %e, seq, "message poll failed"),
    }
}
