//! Handle to one group's decision feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use platepick_core::decision::Decision;
use platepick_core::sync::{ApplyOutcome, FeedSource, GroupFeedState};
use platepick_core::types::DbId;
use tokio::sync::futures::Notified;
use tokio::sync::{broadcast, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Capacity of the accepted-snapshot broadcast channel.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

/// How long [`DecisionFeed::unsubscribe`] waits for the task to exit.
const UNSUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

/// State shared between a [`DecisionFeed`] and its background task.
pub(crate) struct FeedShared {
    group_id: DbId,
    state: RwLock<GroupFeedState>,
    connected: AtomicBool,
    snapshot_tx: broadcast::Sender<Decision>,
    wake: Notify,
}

impl FeedShared {
    pub(crate) fn new(group_id: DbId) -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            group_id,
            state: RwLock::new(GroupFeedState::new()),
            connected: AtomicBool::new(false),
            snapshot_tx,
            wake: Notify::new(),
        }
    }

    /// Record connection health, switching the source if it changed.
    pub(crate) async fn set_connected(&self, connected: bool) {
        let switched = self.state.write().await.set_connected(connected);
        self.connected.store(connected, Ordering::Release);
        if switched {
            tracing::info!(group_id = self.group_id, connected, "Feed source switched");
        }
    }

    /// Offer a snapshot received over the subscription.
    pub(crate) async fn apply_live(&self, snapshot: Decision) -> Option<ApplyOutcome> {
        let outcome = self.state.write().await.on_live_snapshot(snapshot.clone());
        if outcome.is_some_and(ApplyOutcome::changed) {
            let _ = self.snapshot_tx.send(snapshot);
        }
        outcome
    }

    /// Offer a polled list. Returns `false` if it was ignored.
    pub(crate) async fn apply_poll(&self, snapshots: Vec<Decision>) -> bool {
        let accepted = self.state.write().await.on_poll_result(snapshots.clone());
        if accepted {
            for snapshot in snapshots {
                let _ = self.snapshot_tx.send(snapshot);
            }
        }
        accepted
    }

    /// Resolves when [`DecisionFeed::reconnect`] is called.
    pub(crate) fn woken(&self) -> Notified<'_> {
        self.wake.notified()
    }
}

/// A live view of one group's decisions.
///
/// Dropping the handle cancels the background task without waiting for it;
/// [`unsubscribe`](Self::unsubscribe) also waits for it to exit.
pub struct DecisionFeed {
    group_id: DbId,
    shared: Arc<FeedShared>,
    cancel: DropGuard,
    task: JoinHandle<()>,
}

impl DecisionFeed {
    pub(crate) fn new(
        group_id: DbId,
        shared: Arc<FeedShared>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            group_id,
            shared,
            cancel: cancel.drop_guard(),
            task,
        }
    }

    pub fn group_id(&self) -> DbId {
        self.group_id
    }

    /// Whether the WebSocket subscription is currently open.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    pub async fn source(&self) -> FeedSource {
        self.shared.state.read().await.source()
    }

    /// Decisions to show right now, newest first, with lazy expiry applied.
    pub async fn decisions(&self) -> Vec<Decision> {
        self.shared.state.read().await.visible(Utc::now())
    }

    /// The held snapshot for one decision, whatever its status.
    pub async fn get(&self, decision_id: DbId) -> Option<Decision> {
        self.shared.state.read().await.store().get(decision_id).cloned()
    }

    /// Receive every snapshot the feed accepts from now on.
    pub fn snapshots(&self) -> broadcast::Receiver<Decision> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Ask the task to retry the subscription now instead of waiting out
    /// the backoff. Has no effect while connected.
    pub fn reconnect(&self) {
        self.shared.wake.notify_one();
    }

    /// Close the subscription and stop polling. Server state is untouched.
    pub async fn unsubscribe(self) {
        self.cancel.disarm().cancel();
        if tokio::time::timeout(UNSUBSCRIBE_TIMEOUT, self.task).await.is_err() {
            tracing::warn!(group_id = self.group_id, "Feed task did not stop in time");
        }
    }
}
