//! Client-side message timeline: merge fetched snapshots with local state.
//!
//! DESIGN
//! ======
//! Two layers. `merge_messages` is the bare list diff: it reuses local
//! `Arc`s for entries the server reports unchanged (so a renderer can skip
//! them by pointer) and adopts the remote list wholesale otherwise. On its
//! own it drops anything the server has not stored yet.
//!
//! `Timeline` closes that gap with a tagged entry. Messages the user sends
//! live in a separate local set, keyed by a client-generated id that is also
//! sent to the server. A local entry leaves that set only when a fetched
//! snapshot contains its id. A poll that raced the send, in either
//! direction, can therefore never make it disappear.
//!
//! Fetches are numbered. A snapshot older than the last one applied is
//! ignored, so a slow earlier poll cannot roll the view back.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::message::Message;

#[cfg(test)]
#[path = "timeline_test.rs"]
mod tests;

// =============================================================================
// MERGE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Same ids, timestamps and content in the same order; keep the local list.
    Unchanged,
    Changed(Vec<Arc<Message>>),
}

/// Merge a fetched list into the local one.
///
/// Local-only entries are not kept; callers that need them must hold them
/// elsewhere (see [`Timeline`]).
#[must_use]
pub fn merge_messages(local: &[Arc<Message>], remote: Vec<Message>) -> MergeOutcome {
    let same_shape = local.len() == remote.len()
        && local
            .iter()
            .zip(&remote)
            .all(|(l, r)| l.id == r.id && l.timestamp == r.timestamp && l.content == r.content);
    if same_shape {
        return MergeOutcome::Unchanged;
    }

    let by_id: HashMap<&str, &Arc<Message>> = local.iter().map(|m| (m.id.as_str(), m)).collect();
    let merged = remote
        .into_iter()
        .map(|r| match by_id.get(r.id.as_str()) {
            Some(l) if same_fields(l, &r) => Arc::clone(l),
            _ => Arc::new(r),
        })
        .collect();
    MergeOutcome::Changed(merged)
}

fn same_fields(a: &Message, b: &Message) -> bool {
    a.timestamp == b.timestamp && a.content == b.content && a.sender == b.sender && a.kind == b.kind
}

// =============================================================================
// TIMELINE
// =============================================================================

/// Delivery state of a message that no fetched snapshot has contained yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalStatus {
    Sending,
    /// The server acknowledged the post.
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEntry {
    Confirmed(Arc<Message>),
    Local { message: Arc<Message>, status: LocalStatus },
}

impl TimelineEntry {
    #[must_use]
    pub fn message(&self) -> &Message {
        match self {
            Self::Confirmed(message) | Self::Local { message, .. } => message,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<&LocalStatus> {
        match self {
            Self::Confirmed(_) => None,
            Self::Local { status, .. } => Some(status),
        }
    }

    #[must_use]
    pub fn is_mine(&self, user: &str) -> bool {
        self.message().sender == user
    }
}

#[derive(Debug, Clone)]
struct LocalEntry {
    message: Arc<Message>,
    status: LocalStatus,
}

#[derive(Debug, Default)]
pub struct Timeline {
    confirmed: Vec<Arc<Message>>,
    local: Vec<LocalEntry>,
    next_seq: u64,
    last_applied: Option<u64>,
    revision: u64,
}

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages seen in the most recent applied snapshot.
    #[must_use]
    pub fn confirmed(&self) -> &[Arc<Message>] {
        &self.confirmed
    }

    /// Bumped on every observable change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Display order: confirmed history, then local entries oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.confirmed
            .iter()
            .map(|m| TimelineEntry::Confirmed(Arc::clone(m)))
            .chain(self.local.iter().map(|e| TimelineEntry::Local {
                message: Arc::clone(&e.message),
                status: e.status.clone(),
            }))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.confirmed.len() + self.local.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number for the next fetch. Call before issuing the request.
    pub fn begin_fetch(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Apply the snapshot from fetch `seq`. Returns whether anything changed.
    pub fn apply_remote(&mut self, seq: u64, remote: Vec<Message>) -> bool {
        if self.last_applied.is_some_and(|last| seq <= last) {
            debug!(seq, last_applied = ?self.last_applied, "ignoring stale snapshot");
            return false;
        }
        self.last_applied = Some(seq);

        let mut changed = false;
        if let MergeOutcome::Changed(merged) = merge_messages(&self.confirmed, remote) {
            self.confirmed = merged;
            changed = true;
        }

        let seen: HashSet<&str> = self.confirmed.iter().map(|m| m.id.as_str()).collect();
        let before = self.local.len();
        self.local.retain(|e| !seen.contains(e.message.id.as_str()));
        changed |= self.local.len() != before;

        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Add an optimistic entry in `Sending` state. A duplicate id is ignored.
    pub fn push_pending(&mut self, message: Message) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        self.local.push(LocalEntry { message: Arc::new(message), status: LocalStatus::Sending });
        self.revision += 1;
        true
    }

    /// Record the server's copy of a local entry. No-op if a snapshot has
    /// already confirmed it.
    pub fn mark_sent(&mut self, id: &str, stored: Message) -> bool {
        let Some(entry) = self.local.iter_mut().find(|e| e.message.id == id) else {
            return false;
        };
        entry.message = Arc::new(stored);
        entry.status = LocalStatus::Sent;
        self.revision += 1;
        true
    }

    pub fn mark_failed(&mut self, id: &str, reason: impl Into<String>) -> bool {
        let Some(entry) = self.local.iter_mut().find(|e| e.message.id == id) else {
            return false;
        };
        entry.status = LocalStatus::Failed(reason.into());
        self.revision += 1;
        true
    }

    /// Drop a local entry, e.g. a failed send the user dismissed.
    pub fn discard(&mut self, id: &str) -> bool {
        let before = self.local.len();
        self.local.retain(|e| e.message.id != id);
        let changed = self.local.len() != before;
        if changed {
            self.revision += 1;
        }
        changed
    }

    fn contains(&self, id: &str) -> bool {
        self.confirmed.iter().any(|m| m.id == id) || self.local.iter().any(|e| e.message.id == id)
    }
}
