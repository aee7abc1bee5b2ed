//! Decision and ballot models.
//!
//! Rows are flat; [`DecisionRow::into_decision`] assembles the core
//! [`Decision`] snapshot together with its ballots.

use std::collections::{BTreeMap, BTreeSet};

use platepick_core::decision::{
    Ballot, Decision, DecisionMethod, DecisionResult, DecisionScope, DecisionStatus,
    ResultDetail,
};
use platepick_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `decisions` table.
#[derive(Debug, Clone, FromRow)]
pub struct DecisionRow {
    pub id: DbId,
    pub scope: String,
    pub group_id: Option<DbId>,
    pub created_by: DbId,
    pub collection_id: DbId,
    pub method: String,
    pub status: String,
    pub deadline: Option<Timestamp>,
    pub visit_date: Timestamp,
    pub participants: Vec<DbId>,
    pub result_restaurant_id: Option<DbId>,
    pub result_selected_at: Option<Timestamp>,
    pub result_reasoning: Option<String>,
    pub result_detail: Option<Json<ResultDetail>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `decision_votes` table.
#[derive(Debug, Clone, FromRow)]
pub struct VoteRow {
    pub decision_id: DbId,
    pub user_id: DbId,
    pub rankings: Vec<DbId>,
    pub submitted_at: Timestamp,
}

impl DecisionRow {
    /// Build the domain snapshot from this row and its ballots.
    ///
    /// Fails with a decode error if stored enum text is unknown or the
    /// result columns are only partly populated.
    pub fn into_decision(self, votes: Vec<VoteRow>) -> Result<Decision, sqlx::Error> {
        let status: DecisionStatus = self.status.parse().map_err(decode_error)?;
        let result = match (
            self.result_restaurant_id,
            self.result_selected_at,
            self.result_reasoning,
            self.result_detail,
        ) {
            (Some(restaurant_id), Some(selected_at), Some(reasoning), Some(Json(detail))) => {
                Some(DecisionResult {
                    restaurant_id,
                    selected_at,
                    reasoning,
                    detail,
                })
            }
            (None, None, None, None) => None,
            _ => {
                return Err(decode_error(format!(
                    "decision {} has a partial result",
                    self.id
                )))
            }
        };

        let votes: BTreeMap<DbId, Ballot> = votes
            .into_iter()
            .map(|v| {
                (
                    v.user_id,
                    Ballot {
                        submitted_at: v.submitted_at,
                        rankings: v.rankings,
                    },
                )
            })
            .collect();

        Ok(Decision {
            id: self.id,
            scope: self.scope.parse().map_err(decode_error)?,
            group_id: self.group_id,
            created_by: self.created_by,
            collection_id: self.collection_id,
            method: self.method.parse().map_err(decode_error)?,
            status,
            deadline: self.deadline,
            visit_date: self.visit_date,
            participants: self.participants.into_iter().collect::<BTreeSet<_>>(),
            votes,
            result,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn decode_error(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> sqlx::Error {
    sqlx::Error::Decode(e.into())
}

/// Everything needed to insert a decision.
///
/// Random decisions are inserted already completed with `result` set;
/// tiered decisions are inserted active with a deadline.
#[derive(Debug, Clone)]
pub struct NewDecision {
    pub scope: DecisionScope,
    pub group_id: Option<DbId>,
    pub created_by: DbId,
    pub collection_id: DbId,
    pub method: DecisionMethod,
    pub status: DecisionStatus,
    pub deadline: Option<Timestamp>,
    pub visit_date: Timestamp,
    pub participants: Vec<DbId>,
    pub result: Option<DecisionResult>,
    pub created_at: Timestamp,
}
