use std::sync::Arc;

use platepick_events::DecisionEvent;
use tokio::sync::broadcast;

use crate::realtime::snapshot_message;
use crate::ws::WsManager;

/// Fans decision snapshots out to group subscribers.
///
/// Personal decisions have no subscribers and are skipped.
pub struct RealtimeRouter {
    ws_manager: Arc<WsManager>,
}

impl RealtimeRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the routing loop until the event bus is dropped.
    ///
    /// A lagged receiver skips the missed events; affected clients converge
    /// on the next snapshot or their next poll.
    pub async fn run(self, mut receiver: broadcast::Receiver<DecisionEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    self.route_event(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Realtime router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, realtime router shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver one event. Returns the number of connections reached.
    pub async fn route_event(&self, event: &DecisionEvent) -> usize {
        let Some(group_id) = event.group_id else {
            return 0;
        };
        let Some(message) = snapshot_message(&event.decision) else {
            return 0;
        };
        let delivered = self.ws_manager.send_to_group(group_id, message).await;
        tracing::debug!(
            event_type = event.kind.event_type(),
            decision_id = event.decision.id,
            group_id,
            delivered,
            "Routed decision snapshot"
        );
        delivered
    }
}
