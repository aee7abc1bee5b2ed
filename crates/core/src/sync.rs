//! Client-side snapshot reconciliation for realtime decision feeds.
//!
//! Snapshots arrive at least once and possibly out of order. Each one is a
//! full replacement for its decision, keyed by id; a snapshot older than the
//! held `updated_at` is dropped. One with the same `updated_at` but different
//! contents still replaces the held copy.
//!
//! [`GroupFeedState`] is the source-selection policy: live snapshots while the
//! subscription is healthy, polled lists while it is not. The two sources are
//! never blended; switching sources starts from an empty store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decision::{list_visible, Decision};
use crate::types::{DbId, Timestamp};

/// Message pushed from the server to a group subscription.
///
/// Serialized as `{"type": "decision.snapshot", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedMessage {
    #[serde(rename = "decision.snapshot")]
    DecisionSnapshot(Decision),
}

/// What happened when a snapshot was offered to a [`SnapshotStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Replaced,
    /// Identical to the held snapshot; nothing changed.
    Duplicate,
    /// Older than the held snapshot; discarded.
    Stale,
}

impl ApplyOutcome {
    pub fn changed(self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced)
    }
}

/// Latest known snapshot per decision id.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    by_id: HashMap<DbId, Decision>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, snapshot: Decision) -> ApplyOutcome {
        match self.by_id.get(&snapshot.id) {
            Some(held) if snapshot.updated_at < held.updated_at => ApplyOutcome::Stale,
            Some(held) if *held == snapshot => ApplyOutcome::Duplicate,
            Some(_) => {
                self.by_id.insert(snapshot.id, snapshot);
                ApplyOutcome::Replaced
            }
            None => {
                self.by_id.insert(snapshot.id, snapshot);
                ApplyOutcome::Inserted
            }
        }
    }

    /// Replace the whole store with a freshly fetched list.
    pub fn replace_all(&mut self, snapshots: impl IntoIterator<Item = Decision>) {
        self.by_id = snapshots.into_iter().map(|d| (d.id, d)).collect();
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
    }

    pub fn get(&self, decision_id: DbId) -> Option<&Decision> {
        self.by_id.get(&decision_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All held snapshots, newest first.
    pub fn decisions(&self) -> Vec<Decision> {
        let mut all: Vec<Decision> = self.by_id.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        all
    }
}

/// Where the feed's data currently comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Live,
    Polling,
}

/// Prefer the live stream whenever the subscription is connected.
pub fn choose_source(connected: bool) -> FeedSource {
    if connected {
        FeedSource::Live
    } else {
        FeedSource::Polling
    }
}

/// Decision state for one group, fed by exactly one source at a time.
#[derive(Debug, Clone)]
pub struct GroupFeedState {
    source: FeedSource,
    store: SnapshotStore,
}

impl Default for GroupFeedState {
    fn default() -> Self {
        Self {
            source: FeedSource::Polling,
            store: SnapshotStore::new(),
        }
    }
}

impl GroupFeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> FeedSource {
        self.source
    }

    /// Update connection health. Returns `true` when the source switched.
    ///
    /// A switch discards everything held from the previous source.
    pub fn set_connected(&mut self, connected: bool) -> bool {
        let next = choose_source(connected);
        if next == self.source {
            return false;
        }
        self.source = next;
        self.store.clear();
        true
    }

    /// Offer a live snapshot. Ignored while polling.
    pub fn on_live_snapshot(&mut self, snapshot: Decision) -> Option<ApplyOutcome> {
        match self.source {
            FeedSource::Live => Some(self.store.apply(snapshot)),
            FeedSource::Polling => None,
        }
    }

    /// Offer a polled list. Replaces the store wholesale; ignored while live.
    pub fn on_poll_result(&mut self, snapshots: Vec<Decision>) -> bool {
        match self.source {
            FeedSource::Polling => {
                self.store.replace_all(snapshots);
                true
            }
            FeedSource::Live => false,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Decisions to display at `now`, with lazy expiry applied.
    pub fn visible(&self, now: Timestamp) -> Vec<Decision> {
        list_visible(self.store.decisions(), now)
    }
}
