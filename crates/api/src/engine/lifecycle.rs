//! Decision lifecycle: create, vote, complete, close.
//!
//! Guards come from `platepick_core::decision` and are evaluated against a
//! single `now` per call. Vote and complete run inside a transaction holding
//! the decision's row lock; complete and close finish with a conditional
//! update so only one resolution can win. Every committed transition
//! publishes the new snapshot on the event bus.

use chrono::{Duration, Utc};
use platepick_core::decision::{
    ensure_can_close, ensure_can_complete, ensure_can_vote, list_history, list_visible,
    resolve_deadline_hours, validate_rankings, Decision, DecisionMethod, DecisionResult,
    DecisionScope, DecisionStatus, ResultDetail,
};
use platepick_core::error::CoreError;
use platepick_core::tally::{tally, Standing};
use platepick_core::types::{DbId, Timestamp};
use platepick_db::models::decision::NewDecision;
use platepick_db::repositories::{CollectionRepo, DecisionRepo, GroupRepo, SelectionRecordRepo};
use platepick_db::DbPool;
use platepick_events::{DecisionEvent, DecisionEventKind};
use serde::{Deserialize, Serialize};

use crate::engine::selector;
use crate::error::AppResult;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /decisions`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDecision {
    pub scope: DecisionScope,
    pub collection_id: DbId,
    pub method: DecisionMethod,
    pub group_id: Option<DbId>,
    pub created_by: DbId,
    pub visit_date: Timestamp,
    pub deadline_hours: Option<i64>,
    /// Subset of group members allowed to vote. Defaults to every member.
    pub participants: Option<Vec<DbId>>,
}

/// Request body for `POST /decisions/{id}/votes`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitVote {
    pub user_id: DbId,
    pub rankings: Vec<DbId>,
}

/// Request body for completing or closing a decision.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveDecision {
    pub acting_user_id: DbId,
}

/// A completed decision together with the full scoreboard.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedDecision {
    #[serde(flatten)]
    pub decision: Decision,
    pub standings: Vec<Standing>,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Create a decision.
///
/// Random decisions are drawn immediately and stored completed; tiered
/// decisions open for voting until `now + deadline_hours`.
pub async fn create(state: &AppState, input: &CreateDecision) -> AppResult<Decision> {
    let pool = &state.pool;
    let now = Utc::now();

    let participants = resolve_participants(pool, input).await?;

    let collection = CollectionRepo::find_by_id(pool, input.collection_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Collection",
            id: input.collection_id,
        })?;
    if !collection.usable_by(input.created_by, input.group_id) {
        return Err(CoreError::NotAuthorized.into());
    }

    let mut new = NewDecision {
        scope: input.scope,
        group_id: input.group_id,
        created_by: input.created_by,
        collection_id: input.collection_id,
        method: input.method,
        status: DecisionStatus::Active,
        deadline: None,
        visit_date: input.visit_date,
        participants,
        result: None,
        created_at: now,
    };

    let pick = match input.method {
        DecisionMethod::Random => {
            let pick = selector::draw(pool, input.collection_id, now).await?;
            new.status = DecisionStatus::Completed;
            new.result = Some(DecisionResult::new(
                pick.restaurant_id,
                now,
                ResultDetail::Random(pick.reasoning),
            ));
            Some(pick)
        }
        DecisionMethod::Tiered => {
            if CollectionRepo::list_restaurant_ids(pool, input.collection_id)
                .await?
                .is_empty()
            {
                return Err(CoreError::EmptyCandidateSet.into());
            }
            let hours =
                resolve_deadline_hours(input.deadline_hours, state.config.default_deadline_hours)?;
            new.deadline = Some(now + Duration::hours(hours));
            None
        }
    };

    let mut tx = pool.begin().await?;
    let decision = DecisionRepo::insert(&mut tx, &new).await?;
    if let Some(pick) = &pick {
        SelectionRecordRepo::record_selection_tx(
            &mut tx,
            input.collection_id,
            pick.restaurant_id,
            now,
        )
        .await?;
    }
    tx.commit().await?;

    tracing::info!(
        decision_id = decision.id,
        group_id = ?decision.group_id,
        user_id = decision.created_by,
        method = %decision.method,
        status = %decision.status,
        "Decision created"
    );
    publish(state, DecisionEventKind::Created, &decision);
    Ok(decision)
}

/// Cast or replace a participant's ballot on an active tiered decision.
///
/// Resubmitting identical rankings leaves the decision untouched.
pub async fn submit_vote(
    state: &AppState,
    decision_id: DbId,
    input: &SubmitVote,
) -> AppResult<Decision> {
    let pool = &state.pool;

    let mut tx = pool.begin().await?;
    let decision = lock_decision(&mut tx, decision_id).await?;
    // Read the clock under the row lock so it never predates a committed write.
    let now = Utc::now();
    ensure_can_vote(&decision, input.user_id, now)?;

    let collection = CollectionRepo::list_restaurant_ids(pool, decision.collection_id).await?;
    validate_rankings(&input.rankings, &collection)?;

    if decision
        .votes
        .get(&input.user_id)
        .is_some_and(|ballot| ballot.rankings == input.rankings)
    {
        tx.rollback().await?;
        tracing::debug!(decision_id, user_id = input.user_id, "Identical ballot resubmitted");
        return Ok(decision.observed_at(now));
    }

    let updated =
        DecisionRepo::upsert_vote(&mut tx, decision_id, input.user_id, &input.rankings, now).await?;
    tx.commit().await?;

    tracing::info!(
        decision_id,
        user_id = input.user_id,
        ballots = updated.votes.len(),
        "Vote submitted"
    );
    publish(state, DecisionEventKind::VoteSubmitted, &updated);
    Ok(updated.observed_at(now))
}

/// Tally the ballots and finalize a tiered decision.
pub async fn complete(
    state: &AppState,
    decision_id: DbId,
    input: &ResolveDecision,
) -> AppResult<CompletedDecision> {
    let pool = &state.pool;

    let mut tx = pool.begin().await?;
    let decision = lock_decision(&mut tx, decision_id).await?;
    let now = Utc::now();
    let is_admin = acting_user_is_admin(pool, &decision, input.acting_user_id).await?;
    ensure_can_complete(&decision, is_admin, now)?;

    let counts =
        SelectionRecordRepo::counts_for_collection_tx(&mut tx, decision.collection_id).await?;
    let outcome = tally(
        decision.votes.values().map(|ballot| ballot.rankings.as_slice()),
        &counts,
    )?;
    let result = DecisionResult::new(
        outcome.winner_id,
        now,
        ResultDetail::Tiered(outcome.reasoning),
    );

    if !DecisionRepo::complete_if_active(&mut tx, decision_id, &result, now).await? {
        return Err(CoreError::AlreadyResolved.into());
    }
    let completed = lock_decision(&mut tx, decision_id).await?;
    tx.commit().await?;

    tracing::info!(
        decision_id,
        user_id = input.acting_user_id,
        restaurant_id = outcome.winner_id,
        ballots = decision.votes.len(),
        "Decision completed"
    );
    publish(state, DecisionEventKind::Completed, &completed);
    Ok(CompletedDecision {
        decision: completed,
        standings: outcome.standings,
    })
}

/// Close an active decision without a result.
pub async fn close(
    state: &AppState,
    decision_id: DbId,
    input: &ResolveDecision,
) -> AppResult<Decision> {
    let pool = &state.pool;
    let now = Utc::now();

    let decision = find_decision(pool, decision_id).await?;
    let is_admin = acting_user_is_admin(pool, &decision, input.acting_user_id).await?;
    ensure_can_close(&decision, is_admin, now)?;

    if !DecisionRepo::close_if_active(pool, decision_id, now).await? {
        return Err(CoreError::AlreadyResolved.into());
    }
    let closed = find_decision(pool, decision_id).await?;

    tracing::info!(decision_id, user_id = input.acting_user_id, "Decision closed");
    publish(state, DecisionEventKind::Closed, &closed);
    Ok(closed)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// One decision with lazy expiry applied.
pub async fn get(pool: &DbPool, decision_id: DbId) -> AppResult<Decision> {
    Ok(find_decision(pool, decision_id).await?.observed_at(Utc::now()))
}

/// Decisions shown in a group's primary list.
pub async fn list_for_group(pool: &DbPool, group_id: DbId) -> AppResult<Vec<Decision>> {
    list_group(pool, group_id, |decisions, now| list_visible(decisions, now)).await
}

/// Resolved decisions for a group's history view.
pub async fn history_for_group(pool: &DbPool, group_id: DbId) -> AppResult<Vec<Decision>> {
    list_group(pool, group_id, |decisions, now| list_history(decisions, now)).await
}

async fn list_group(
    pool: &DbPool,
    group_id: DbId,
    filter: fn(Vec<Decision>, Timestamp) -> Vec<Decision>,
) -> AppResult<Vec<Decision>> {
    ensure_group_exists(pool, group_id).await?;
    let decisions = DecisionRepo::list_for_group(pool, group_id).await?;
    Ok(filter(decisions, Utc::now()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Voters for a new decision: the creator alone for personal decisions,
/// group members (or the requested subset) for group decisions.
async fn resolve_participants(pool: &DbPool, input: &CreateDecision) -> AppResult<Vec<DbId>> {
    match (input.scope, input.group_id) {
        (DecisionScope::Personal, None) => match input.participants.as_deref() {
            None => Ok(vec![input.created_by]),
            Some([only]) if *only == input.created_by => Ok(vec![input.created_by]),
            Some(_) => Err(CoreError::Validation(
                "Personal decisions have exactly one participant, the creator".to_string(),
            )
            .into()),
        },
        (DecisionScope::Personal, Some(_)) => Err(CoreError::Validation(
            "Personal decisions cannot belong to a group".to_string(),
        )
        .into()),
        (DecisionScope::Group, None) => {
            Err(CoreError::Validation("Group decisions require a group_id".to_string()).into())
        }
        (DecisionScope::Group, Some(group_id)) => {
            ensure_group_exists(pool, group_id).await?;
            let members = GroupRepo::list_member_ids(pool, group_id).await?;
            if !members.contains(&input.created_by) {
                return Err(CoreError::NotParticipant.into());
            }
            match &input.participants {
                None => Ok(members),
                Some(requested) => {
                    let mut requested = requested.clone();
                    requested.sort_unstable();
                    requested.dedup();
                    if requested.is_empty() {
                        return Err(CoreError::Validation(
                            "At least one participant is required".to_string(),
                        )
                        .into());
                    }
                    if let Some(outsider) = requested.iter().find(|id| !members.contains(id)) {
                        return Err(CoreError::Validation(format!(
                            "User {outsider} is not a member of this group"
                        ))
                        .into());
                    }
                    Ok(requested)
                }
            }
        }
    }
}

/// Group admins resolve group decisions; the creator resolves personal ones.
async fn acting_user_is_admin(
    pool: &DbPool,
    decision: &Decision,
    user_id: DbId,
) -> AppResult<bool> {
    match decision.group_id {
        Some(group_id) => Ok(GroupRepo::is_admin(pool, group_id, user_id).await?),
        None => Ok(decision.created_by == user_id),
    }
}

async fn lock_decision(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    decision_id: DbId,
) -> AppResult<Decision> {
    DecisionRepo::lock_for_update(tx, decision_id)
        .await?
        .ok_or_else(|| decision_not_found(decision_id))
}

async fn find_decision(pool: &DbPool, decision_id: DbId) -> AppResult<Decision> {
    DecisionRepo::find_by_id(pool, decision_id)
        .await?
        .ok_or_else(|| decision_not_found(decision_id))
}

fn decision_not_found(id: DbId) -> crate::error::AppError {
    CoreError::NotFound {
        entity: "Decision",
        id,
    }
    .into()
}

async fn ensure_group_exists(pool: &DbPool, group_id: DbId) -> AppResult<()> {
    GroupRepo::find_by_id(pool, group_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Group",
            id: group_id,
        })?;
    Ok(())
}

fn publish(state: &AppState, kind: DecisionEventKind, decision: &Decision) {
    state
        .event_bus
        .publish(DecisionEvent::new(kind, decision.clone()));
}
