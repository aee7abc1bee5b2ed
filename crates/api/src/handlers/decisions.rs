//! Handlers for the `/decisions` resource.
//!
//! The acting user is taken from the request body; authentication is
//! handled upstream of this service.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use platepick_core::types::DbId;
use serde::Deserialize;

use crate::engine::lifecycle::{self, CreateDecision, ResolveDecision, SubmitVote};
use crate::engine::selector::{self, RandomSelectRequest};
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /decisions`.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub collection_id: DbId,
}

/// POST /api/v1/decisions
pub async fn create_decision(
    State(state): State<AppState>,
    Json(input): Json<CreateDecision>,
) -> AppResult<impl IntoResponse> {
    let decision = lifecycle::create(&state, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: decision })))
}

/// GET /api/v1/decisions/{id}
pub async fn get_decision(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let decision = lifecycle::get(&state.pool, id).await?;
    Ok(Json(DataResponse { data: decision }))
}

/// POST /api/v1/decisions/{id}/votes
///
/// Submit or replace the caller's ranked ballot.
pub async fn submit_vote(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitVote>,
) -> AppResult<impl IntoResponse> {
    let decision = lifecycle::submit_vote(&state, id, &input).await?;
    Ok(Json(DataResponse { data: decision }))
}

/// PUT /api/v1/decisions/{id}/votes
///
/// Tally the ballots and complete the decision.
pub async fn complete_decision(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ResolveDecision>,
) -> AppResult<impl IntoResponse> {
    let completed = lifecycle::complete(&state, id, &input).await?;
    Ok(Json(DataResponse { data: completed }))
}

/// DELETE /api/v1/decisions/{id}/votes
///
/// Close the decision without a result.
pub async fn close_decision(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ResolveDecision>,
) -> AppResult<impl IntoResponse> {
    let decision = lifecycle::close(&state, id, &input).await?;
    Ok(Json(DataResponse { data: decision }))
}

/// POST /api/v1/decisions/random-select
///
/// One-shot weighted pick. Records the selection; no decision is stored.
pub async fn random_select(
    State(state): State<AppState>,
    Json(input): Json<RandomSelectRequest>,
) -> AppResult<impl IntoResponse> {
    let selection = selector::select(&state.pool, &input).await?;
    Ok(Json(DataResponse { data: selection }))
}

/// GET /api/v1/decisions?collection_id=
pub async fn collection_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<impl IntoResponse> {
    let stats = selector::statistics(&state.pool, query.collection_id).await?;
    Ok(Json(DataResponse { data: stats }))
}
