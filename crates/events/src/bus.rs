//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the decision engine
//! (publisher) and the realtime router (subscriber).

use chrono::{DateTime, Utc};
use platepick_core::decision::Decision;
use platepick_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// DecisionEvent
// ---------------------------------------------------------------------------

/// Which transition produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionEventKind {
    Created,
    VoteSubmitted,
    Completed,
    Closed,
}

impl DecisionEventKind {
    /// Dot-separated event name, e.g. `"decision.vote_submitted"`.
    pub fn event_type(self) -> &'static str {
        match self {
            Self::Created => "decision.created",
            Self::VoteSubmitted => "decision.vote_submitted",
            Self::Completed => "decision.completed",
            Self::Closed => "decision.closed",
        }
    }
}

/// A decision state transition.
///
/// `decision` is the complete snapshot after the transition, so consumers
/// replace rather than merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub kind: DecisionEventKind,
    /// Copied from the snapshot; `None` for personal decisions.
    pub group_id: Option<DbId>,
    pub decision: Decision,
    pub timestamp: DateTime<Utc>,
}

impl DecisionEvent {
    pub fn new(kind: DecisionEventKind, decision: Decision) -> Self {
        Self {
            kind,
            group_id: decision.group_id,
            decision,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`DecisionEvent`].
pub struct EventBus {
    sender: broadcast::Sender<DecisionEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped; clients recover state from
    /// the group decision list.
    pub fn publish(&self, event: DecisionEvent) {
        tracing::debug!(
            event_type = event.kind.event_type(),
            decision_id = event.decision.id,
            group_id = ?event.group_id,
            "Publishing decision event",
        );
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DecisionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
