//! Route definitions for decisions.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::decisions;
use crate::state::AppState;

/// Decision routes mounted at `/decisions`.
///
/// ```text
/// POST   /                    -> create_decision
/// GET    /?collection_id=     -> collection_stats
/// POST   /random-select       -> random_select
/// GET    /{id}                -> get_decision
/// POST   /{id}/votes          -> submit_vote
/// PUT    /{id}/votes          -> complete_decision
/// DELETE /{id}/votes          -> close_decision
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(decisions::create_decision).get(decisions::collection_stats),
        )
        .route("/random-select", post(decisions::random_select))
        .route("/{id}", get(decisions::get_decision))
        .route(
            "/{id}/votes",
            post(decisions::submit_vote)
                .put(decisions::complete_decision)
                .delete(decisions::close_decision),
        )
}
