//! Subscription task: connect, stream snapshots, fall back to polling.
//!
//! One task runs per [`DecisionFeed`]:
//!
//! ```text
//! connect ──ok──> Live: apply snapshots until the socket drops
//!    │                          │
//!    └──err──> Polling <────────┘
//!               poll every poll_interval until the backoff delay elapses
//!               (or reconnect() is called), then connect again
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use platepick_core::decision::Decision;
use platepick_core::sync::FeedMessage;
use platepick_core::types::DbId;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::config::RealtimeConfig;
use crate::error::RealtimeError;
use crate::feed::{DecisionFeed, FeedShared};
use crate::messages::parse_message;
use crate::poller::DecisionPoller;
use crate::reconnect::next_delay;

/// An open group subscription.
pub type GroupSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Entry point for subscribing to group decision feeds on one server.
pub struct RealtimeClient {
    config: Arc<RealtimeConfig>,
    poller: DecisionPoller,
}

impl RealtimeClient {
    pub fn new(config: RealtimeConfig) -> Self {
        let poller = DecisionPoller::new(config.api_url.clone());
        Self {
            config: Arc::new(config),
            poller,
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Start following `group_id`. Must be called inside a tokio runtime.
    pub fn subscribe(&self, group_id: DbId) -> DecisionFeed {
        let shared = Arc::new(FeedShared::new(group_id));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_feed_loop(
            Arc::clone(&self.config),
            self.poller.clone(),
            group_id,
            Arc::clone(&shared),
            cancel.clone(),
        ));

        tracing::info!(group_id, "Subscribed to group feed");
        DecisionFeed::new(group_id, shared, cancel, task)
    }
}

/// Open the WebSocket subscription for one group.
pub async fn connect(
    config: &RealtimeConfig,
    group_id: DbId,
) -> Result<GroupSocket, RealtimeError> {
    let url = config.group_ws_url(group_id);
    let (socket, _response) = connect_async(url.as_str()).await.map_err(|e| {
        RealtimeError::Connection(format!("Failed to subscribe to group {group_id} at {url}: {e}"))
    })?;
    Ok(socket)
}

/// How a polling phase ended.
enum PollPhaseEnd {
    DelayElapsed,
    ReconnectRequested,
    Cancelled,
}

async fn run_feed_loop(
    config: Arc<RealtimeConfig>,
    poller: DecisionPoller,
    group_id: DbId,
    shared: Arc<FeedShared>,
    cancel: CancellationToken,
) {
    let mut delay = config.reconnect.initial_delay;
    let mut last_poll: Option<Instant> = None;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect(&config, group_id) => result,
        };

        match connected {
            Ok(mut socket) => {
                tracing::info!(group_id, attempt, "Group feed connected");
                shared.set_connected(true).await;
                attempt = 0;
                delay = config.reconnect.initial_delay;

                let ended = process_messages(&mut socket, group_id, &shared, &cancel).await;
                shared.set_connected(false).await;
                last_poll = None;
                if cancel.is_cancelled() {
                    break;
                }
                match ended {
                    Ok(()) => tracing::info!(group_id, "Group feed closed by server"),
                    Err(e) => tracing::warn!(group_id, error = %e, "Group feed dropped"),
                }
            }
            Err(e) => {
                tracing::warn!(
                    group_id,
                    attempt,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Group feed connection failed",
                );
            }
        }

        let phase_end = poll_until_retry(
            &poller,
            &config,
            group_id,
            &shared,
            &cancel,
            delay,
            &mut last_poll,
        )
        .await;
        match phase_end {
            PollPhaseEnd::Cancelled => break,
            PollPhaseEnd::ReconnectRequested => delay = config.reconnect.initial_delay,
            PollPhaseEnd::DelayElapsed => delay = next_delay(delay, &config.reconnect),
        }
    }

    tracing::info!(group_id, "Group feed stopped");
}

/// Read frames until the socket closes or the feed is cancelled.
async fn process_messages(
    socket: &mut GroupSocket,
    group_id: DbId,
    shared: &FeedShared,
    cancel: &CancellationToken,
) -> Result<(), RealtimeError> {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = socket.close(None).await;
                return Ok(());
            }
            _ = shared.woken() => {
                tracing::debug!(group_id, "Reconnect requested while connected, ignoring");
                continue;
            }
            frame = socket.next() => frame,
        };

        match frame {
            None => return Ok(()),
            Some(Ok(Message::Text(text))) => match parse_message(&text) {
                Ok(Some(FeedMessage::DecisionSnapshot(decision))) => {
                    apply_snapshot(group_id, shared, decision).await;
                }
                Ok(None) => tracing::trace!(group_id, "Skipping unknown message kind"),
                Err(e) => tracing::warn!(group_id, error = %e, "Unparseable feed frame"),
            },
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(group_id, ?frame, "Server closed group feed");
                return Ok(());
            }
            // Pings are answered by tungstenite; binary frames are unused.
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(RealtimeError::Protocol(e.to_string())),
        }
    }
}

async fn apply_snapshot(group_id: DbId, shared: &FeedShared, decision: Decision) {
    if decision.group_id != Some(group_id) {
        tracing::warn!(
            group_id,
            decision_id = decision.id,
            "Snapshot for another group on this feed, ignoring"
        );
        return;
    }
    let decision_id = decision.id;
    let outcome = shared.apply_live(decision).await;
    tracing::debug!(group_id, decision_id, ?outcome, "Live snapshot offered");
}

/// Serve the polled view until it is time to retry the subscription.
///
/// Polls immediately if the last poll is older than `poll_interval`.
async fn poll_until_retry(
    poller: &DecisionPoller,
    config: &RealtimeConfig,
    group_id: DbId,
    shared: &FeedShared,
    cancel: &CancellationToken,
    delay: Duration,
    last_poll: &mut Option<Instant>,
) -> PollPhaseEnd {
    let retry_at = Instant::now() + delay;

    loop {
        let poll_due = last_poll.map_or(true, |at| at.elapsed() >= config.poll_interval);
        if poll_due {
            let polled = tokio::select! {
                _ = cancel.cancelled() => return PollPhaseEnd::Cancelled,
                result = poller.fetch_group(group_id) => result,
            };
            match polled {
                Ok(decisions) => {
                    let count = decisions.len();
                    if shared.apply_poll(decisions).await {
                        tracing::debug!(group_id, count, "Poll result applied");
                    }
                }
                Err(e) => tracing::warn!(group_id, error = %e, "Poll failed"),
            }
            *last_poll = Some(Instant::now());
        }

        let next_poll = last_poll.map_or(retry_at, |at| at + config.poll_interval);
        tokio::select! {
            _ = cancel.cancelled() => return PollPhaseEnd::Cancelled,
            _ = shared.woken() => return PollPhaseEnd::ReconnectRequested,
            _ = tokio::time::sleep_until(next_poll.min(retry_at)) => {}
        }

        if Instant::now() >= retry_at {
            return PollPhaseEnd::DelayElapsed;
        }
    }
}
