//! Route definitions for group-scoped decision lists.

use axum::routing::get;
use axum::Router;

use crate::handlers::groups;
use crate::state::AppState;

/// Group routes mounted at `/groups`.
///
/// ```text
/// GET /{group_id}/decisions           -> list_decisions
/// GET /{group_id}/decisions/history   -> decision_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{group_id}/decisions", get(groups::list_decisions))
        .route("/{group_id}/decisions/history", get(groups::decision_history))
}
