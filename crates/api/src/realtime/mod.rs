//! Server side of realtime decision sync.
//!
//! [`RealtimeRouter`] forwards decision events from the bus to the
//! WebSocket connections subscribed to the decision's group.

mod router;

use axum::extract::ws::Message;
use chrono::Utc;
use platepick_core::decision::Decision;
use platepick_core::sync::FeedMessage;

pub use router::RealtimeRouter;

/// Encode a decision as a `decision.snapshot` text frame.
///
/// The snapshot carries the status as observed now, so a lapsed deadline
/// reads as expired.
pub fn snapshot_message(decision: &Decision) -> Option<Message> {
    let message = FeedMessage::DecisionSnapshot(decision.clone().observed_at(Utc::now()));
    match serde_json::to_string(&message) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            tracing::error!(decision_id = decision.id, error = %e, "Failed to encode snapshot");
            None
        }
    }
}
