use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use platepick_core::error::CoreError;
use platepick_core::types::DbId;
use platepick_db::repositories::GroupRepo;

use crate::engine::lifecycle;
use crate::error::AppResult;
use crate::realtime::snapshot_message;
use crate::state::AppState;

/// GET /api/v1/ws/groups/{group_id}
///
/// Upgrades to a WebSocket subscribed to one group's decisions. Unknown
/// groups are rejected with 404 before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
) -> AppResult<Response> {
    GroupRepo::find_by_id(&state.pool, group_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Group",
            id: group_id,
        })?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, group_id))
        .into_response())
}

/// Manage a single subscription after upgrade.
///
///   1. Registers the connection with `WsManager` for its group.
///   2. Queues the group's currently visible decisions as snapshots.
///   3. Spawns a sender task that forwards queued messages to the sink.
///   4. Drains inbound frames until the client goes away, then cleans up.
///
/// Registration happens before the initial load so no transition committed
/// in between is missed; clients discard anything older than what they hold.
async fn handle_socket(socket: WebSocket, state: AppState, group_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let ws_manager = state.ws_manager.clone();
    tracing::info!(conn_id = %conn_id, group_id, "WebSocket subscribed");

    let mut rx = ws_manager.add(conn_id.clone(), group_id).await;

    match lifecycle::list_for_group(&state.pool, group_id).await {
        Ok(decisions) => {
            for decision in &decisions {
                if let Some(message) = snapshot_message(decision) {
                    ws_manager.send_to(&conn_id, message).await;
                }
            }
            tracing::debug!(
                conn_id = %conn_id,
                count = decisions.len(),
                "Initial snapshots queued"
            );
        }
        Err(e) => {
            tracing::warn!(
                conn_id = %conn_id,
                group_id,
                error = %e,
                "Failed to load initial snapshots"
            );
        }
    }

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Clients only listen; inbound frames other than Close are ignored.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, group_id, "WebSocket unsubscribed");
}
