//! Repository for the `decisions` and `decision_votes` tables.
//!
//! Status transitions are conditional updates (`WHERE status = 'active'`),
//! so of two racing `complete`/`close` calls exactly one sees a row change.
//!
//! Every write moves `updated_at` strictly forward (at least one microsecond
//! past the stored value), so no two distinct snapshots share a stamp even
//! when the caller's clock reading predates a competing commit.

use std::collections::HashMap;

use platepick_core::decision::{Decision, DecisionResult, DecisionStatus};
use platepick_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::decision::{DecisionRow, NewDecision, VoteRow};

/// Column list for decisions queries.
const COLUMNS: &str = "id, scope, group_id, created_by, collection_id, method, status, \
    deadline, visit_date, participants, result_restaurant_id, result_selected_at, \
    result_reasoning, result_detail, created_at, updated_at";

/// Column list for decision_votes queries.
const VOTE_COLUMNS: &str = "decision_id, user_id, rankings, submitted_at";

/// Provides persistence for decisions and their ballots.
pub struct DecisionRepo;

impl DecisionRepo {
    /// Insert a decision inside an open transaction, returning the snapshot.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        input: &NewDecision,
    ) -> Result<Decision, sqlx::Error> {
        let query = format!(
            "INSERT INTO decisions
                (scope, group_id, created_by, collection_id, method, status, deadline,
                 visit_date, participants, result_restaurant_id, result_selected_at,
                 result_reasoning, result_detail, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
             RETURNING {COLUMNS}"
        );
        let result = input.result.as_ref();
        let row = sqlx::query_as::<_, DecisionRow>(&query)
            .bind(input.scope.as_str())
            .bind(input.group_id)
            .bind(input.created_by)
            .bind(input.collection_id)
            .bind(input.method.as_str())
            .bind(input.status.as_str())
            .bind(input.deadline)
            .bind(input.visit_date)
            .bind(&input.participants)
            .bind(result.map(|r| r.restaurant_id))
            .bind(result.map(|r| r.selected_at))
            .bind(result.map(|r| r.reasoning.as_str()))
            .bind(result.map(|r| Json(&r.detail)))
            .bind(input.created_at)
            .fetch_one(&mut **tx)
            .await?;
        row.into_decision(Vec::new())
    }

    /// Find a decision with its ballots.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Decision>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM decisions WHERE id = $1");
        let Some(row) = sqlx::query_as::<_, DecisionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };
        let votes = Self::list_votes(pool, id).await?;
        row.into_decision(votes).map(Some)
    }

    /// Load a decision and take a row lock held until the transaction ends.
    pub async fn lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Decision>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM decisions WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, DecisionRow>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
        else {
            return Ok(None);
        };
        let query = format!(
            "SELECT {VOTE_COLUMNS} FROM decision_votes WHERE decision_id = $1 ORDER BY user_id"
        );
        let votes = sqlx::query_as::<_, VoteRow>(&query)
            .bind(id)
            .fetch_all(&mut **tx)
            .await?;
        row.into_decision(votes).map(Some)
    }

    /// Insert or replace a participant's ballot and bump the decision's
    /// `updated_at`. Returns the refreshed snapshot.
    ///
    /// The caller must hold the row lock from [`lock_for_update`](Self::lock_for_update).
    pub async fn upsert_vote(
        tx: &mut Transaction<'_, Postgres>,
        decision_id: DbId,
        user_id: DbId,
        rankings: &[DbId],
        at: Timestamp,
    ) -> Result<Decision, sqlx::Error> {
        sqlx::query(
            "INSERT INTO decision_votes (decision_id, user_id, rankings, submitted_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (decision_id, user_id) DO UPDATE
                SET rankings = EXCLUDED.rankings,
                    submitted_at = EXCLUDED.submitted_at",
        )
        .bind(decision_id)
        .bind(user_id)
        .bind(rankings)
        .bind(at)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            "UPDATE decisions
                SET updated_at = GREATEST(updated_at + interval '1 microsecond', $2)
              WHERE id = $1",
        )
            .bind(decision_id)
            .bind(at)
            .execute(&mut **tx)
            .await?;

        Self::lock_for_update(tx, decision_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Move an active decision to `completed` with `result`.
    ///
    /// Returns `false` if the decision was no longer active.
    pub async fn complete_if_active(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        result: &DecisionResult,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE decisions
                SET status = $2,
                    result_restaurant_id = $3,
                    result_selected_at = $4,
                    result_reasoning = $5,
                    result_detail = $6,
                    updated_at = GREATEST(updated_at + interval '1 microsecond', $7)
              WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .bind(DecisionStatus::Completed.as_str())
        .bind(result.restaurant_id)
        .bind(result.selected_at)
        .bind(&result.reasoning)
        .bind(Json(&result.detail))
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Move an active, unexpired decision to `closed` without a result.
    ///
    /// Returns `false` if it was already resolved or its deadline passed.
    pub async fn close_if_active(
        pool: &PgPool,
        id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE decisions
                SET status = $2,
                    updated_at = GREATEST(updated_at + interval '1 microsecond', $3)
              WHERE id = $1
                AND status = 'active'
                AND (deadline IS NULL OR deadline > $3)",
        )
        .bind(id)
        .bind(DecisionStatus::Closed.as_str())
        .bind(now)
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// All ballots for a decision, by user id.
    pub async fn list_votes(
        pool: &PgPool,
        decision_id: DbId,
    ) -> Result<Vec<VoteRow>, sqlx::Error> {
        let query = format!(
            "SELECT {VOTE_COLUMNS} FROM decision_votes WHERE decision_id = $1 ORDER BY user_id"
        );
        sqlx::query_as::<_, VoteRow>(&query)
            .bind(decision_id)
            .fetch_all(pool)
            .await
    }

    /// Every decision in a group with ballots, newest first.
    ///
    /// Visibility filtering happens in the caller against a single `now`.
    pub async fn list_for_group(
        pool: &PgPool,
        group_id: DbId,
    ) -> Result<Vec<Decision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM decisions
             WHERE group_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, DecisionRow>(&query)
            .bind(group_id)
            .fetch_all(pool)
            .await?;
        Self::attach_votes(pool, rows).await
    }

    /// Every decision a user participates in, newest first.
    pub async fn list_for_participant(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Decision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM decisions
             WHERE $1 = ANY(participants)
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, DecisionRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Self::attach_votes(pool, rows).await
    }

    /// Number of decisions ever made from a collection.
    pub async fn count_for_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM decisions WHERE collection_id = $1")
            .bind(collection_id)
            .fetch_one(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn attach_votes(
        pool: &PgPool,
        rows: Vec<DecisionRow>,
    ) -> Result<Vec<Decision>, sqlx::Error> {
        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let query = format!(
            "SELECT {VOTE_COLUMNS} FROM decision_votes
             WHERE decision_id = ANY($1)
             ORDER BY decision_id, user_id"
        );
        let votes = sqlx::query_as::<_, VoteRow>(&query)
            .bind(&ids)
            .fetch_all(pool)
            .await?;

        let mut by_decision: HashMap<DbId, Vec<VoteRow>> = HashMap::new();
        for vote in votes {
            by_decision.entry(vote.decision_id).or_default().push(vote);
        }

        rows.into_iter()
            .map(|row| {
                let votes = by_decision.remove(&row.id).unwrap_or_default();
                row.into_decision(votes)
            })
            .collect()
    }
}
