//! Random selection against persisted selection history.

use chrono::Utc;
use platepick_core::error::CoreError;
use platepick_core::selection::{weighted_pick, Candidate, Pick, SelectionReasoning};
use platepick_core::types::{DbId, Timestamp};
use platepick_core::weight::weight_at;
use platepick_db::repositories::{CollectionRepo, DecisionRepo, SelectionRecordRepo};
use platepick_db::DbPool;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Request body for `POST /decisions/random-select`.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomSelectRequest {
    pub collection_id: DbId,
    pub visit_date: Timestamp,
}

/// Outcome of a one-shot random pick.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub restaurant_id: DbId,
    pub reasoning: String,
    pub detail: SelectionReasoning,
    pub visit_date: Timestamp,
    pub selected_at: Timestamp,
}

/// Per-restaurant statistics for a collection.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantStats {
    pub restaurant_id: DbId,
    pub selection_count: i32,
    pub last_selected: Option<Timestamp>,
    pub current_weight: f64,
}

/// Response for `GET /decisions?collection_id=`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub collection_id: DbId,
    pub total_decisions: i64,
    pub restaurants: Vec<RestaurantStats>,
}

/// Capture the candidate set for a collection as of `now`.
///
/// Fails with `EmptyCandidateSet` when the collection has no restaurants.
pub async fn load_candidates(
    pool: &DbPool,
    collection_id: DbId,
    now: Timestamp,
) -> AppResult<Vec<Candidate>> {
    let history = SelectionRecordRepo::list_history_for_collection(pool, collection_id).await?;
    if history.is_empty() {
        return Err(CoreError::EmptyCandidateSet.into());
    }
    Ok(history.iter().map(|h| h.to_candidate(now)).collect())
}

/// Draw one restaurant without recording the selection.
///
/// The thread RNG is scoped so it never lives across an await point.
pub async fn draw(pool: &DbPool, collection_id: DbId, now: Timestamp) -> AppResult<Pick> {
    let candidates = load_candidates(pool, collection_id, now).await?;
    let pick = {
        let mut rng = rand::rng();
        weighted_pick(&candidates, &mut rng)?
    };
    if pick.uniform_fallback {
        tracing::warn!(collection_id, "Degenerate weights, fell back to a uniform draw");
    }
    Ok(pick)
}

/// Draw a restaurant and record the selection in the weight store.
pub async fn select(pool: &DbPool, input: &RandomSelectRequest) -> AppResult<Selection> {
    ensure_collection_exists(pool, input.collection_id).await?;
    let now = Utc::now();
    let pick = draw(pool, input.collection_id, now).await?;

    SelectionRecordRepo::record_selection(pool, input.collection_id, pick.restaurant_id, now)
        .await?;

    tracing::info!(
        collection_id = input.collection_id,
        restaurant_id = pick.restaurant_id,
        weight = pick.reasoning.weight,
        "Random restaurant selected"
    );

    Ok(Selection {
        restaurant_id: pick.restaurant_id,
        reasoning: pick.reasoning.to_string(),
        detail: pick.reasoning,
        visit_date: input.visit_date,
        selected_at: now,
    })
}

/// Selection statistics for every restaurant currently in a collection.
pub async fn statistics(pool: &DbPool, collection_id: DbId) -> AppResult<CollectionStats> {
    ensure_collection_exists(pool, collection_id).await?;
    let now = Utc::now();

    let total_decisions = DecisionRepo::count_for_collection(pool, collection_id).await?;
    let restaurants = SelectionRecordRepo::list_history_for_collection(pool, collection_id)
        .await?
        .into_iter()
        .map(|h| RestaurantStats {
            restaurant_id: h.restaurant_id,
            selection_count: h.selection_count,
            last_selected: h.last_selected_at,
            current_weight: weight_at(h.last_selected_at, now),
        })
        .collect();

    Ok(CollectionStats {
        collection_id,
        total_decisions,
        restaurants,
    })
}

async fn ensure_collection_exists(pool: &DbPool, collection_id: DbId) -> AppResult<()> {
    CollectionRepo::find_by_id(pool, collection_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Collection",
            id: collection_id,
        })?;
    Ok(())
}
