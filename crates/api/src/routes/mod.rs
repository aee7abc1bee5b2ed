pub mod decisions;
pub mod groups;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws/groups/{group_id}                  WebSocket decision feed
///
/// /decisions                             create (POST), collection stats (GET ?collection_id=)
/// /decisions/random-select               one-shot weighted pick (POST)
/// /decisions/{id}                        get
/// /decisions/{id}/votes                  vote (POST), complete (PUT), close (DELETE)
///
/// /groups/{group_id}/decisions           visible decisions
/// /groups/{group_id}/decisions/history   resolved decisions
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws/groups/{group_id}", get(ws::ws_handler))
        .nest("/decisions", decisions::router())
        .nest("/groups", groups::router())
}
