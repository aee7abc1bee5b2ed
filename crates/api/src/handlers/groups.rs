//! Group-scoped decision lists.
//!
//! The primary list doubles as the polling fallback for realtime clients.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use platepick_core::types::DbId;

use crate::engine::lifecycle;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/groups/{group_id}/decisions
pub async fn list_decisions(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let decisions = lifecycle::list_for_group(&state.pool, group_id).await?;
    Ok(Json(DataResponse { data: decisions }))
}

/// GET /api/v1/groups/{group_id}/decisions/history
pub async fn decision_history(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let decisions = lifecycle::history_for_group(&state.pool, group_id).await?;
    Ok(Json(DataResponse { data: decisions }))
}
