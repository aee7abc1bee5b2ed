//! Decision entity, lifecycle state machine, and guard functions.
//!
//! This module lives in `core` (zero internal deps) so the repository layer,
//! the HTTP orchestrator, and the realtime client all agree on what a
//! Decision looks like and which transitions are legal.
//!
//! ```text
//!            create(random)
//!   (none) ─────────────────────────────► completed
//!      │
//!      │ create(tiered)        complete
//!      └──────────────► active ─────────► completed
//!                         │  │  close
//!                         │  └──────────► closed
//!                         │ deadline passes (observed lazily)
//!                         └─────────────► expired
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::selection::SelectionReasoning;
use crate::tally::{TallyReasoning, MAX_RANKINGS};
use crate::types::{DbId, Timestamp};

/// Completed decisions stay in the primary list for this long after the
/// planned visit.
pub const COMPLETED_VISIBLE_HOURS: i64 = 24;

/// Default voting window for tiered decisions, in hours.
pub const DEFAULT_DEADLINE_HOURS: i64 = 24;

/// Shortest voting window a caller may request, in hours.
pub const MIN_DEADLINE_HOURS: i64 = 1;

/// Longest voting window a caller may request (one week), in hours.
pub const MAX_DEADLINE_HOURS: i64 = 168;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $variant:ident => $text:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $( $variant ),+
        }

        impl $name {
            /// The lowercase text form stored in the database.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        concat!("Unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum! {
    /// Lifecycle state of a decision. Everything but `Active` is terminal.
    DecisionStatus {
        Active => "active",
        Completed => "completed",
        Expired => "expired",
        Closed => "closed",
    }
}

text_enum! {
    /// How the restaurant is chosen.
    DecisionMethod {
        Random => "random",
        Tiered => "tiered",
    }
}

text_enum! {
    /// Whether one person or a group decides.
    DecisionScope {
        Personal => "personal",
        Group => "group",
    }
}

impl DecisionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// One participant's ranked ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub submitted_at: Timestamp,
    pub rankings: Vec<DbId>,
}

/// Machine-readable explanation attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ResultDetail {
    Random(SelectionReasoning),
    Tiered(TallyReasoning),
}

impl fmt::Display for ResultDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random(r) => fmt::Display::fmt(r, f),
            Self::Tiered(r) => fmt::Display::fmt(r, f),
        }
    }
}

/// The chosen restaurant, present only on completed decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub restaurant_id: DbId,
    pub selected_at: Timestamp,
    /// Human-readable text rendered from `detail`.
    pub reasoning: String,
    pub detail: ResultDetail,
}

impl DecisionResult {
    pub fn new(restaurant_id: DbId, selected_at: Timestamp, detail: ResultDetail) -> Self {
        Self {
            restaurant_id,
            selected_at,
            reasoning: detail.to_string(),
            detail,
        }
    }
}

/// Full snapshot of a decision, as persisted and as broadcast to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DbId,
    pub scope: DecisionScope,
    pub group_id: Option<DbId>,
    pub created_by: DbId,
    pub collection_id: DbId,
    pub method: DecisionMethod,
    pub status: DecisionStatus,
    pub deadline: Option<Timestamp>,
    pub visit_date: Timestamp,
    pub participants: BTreeSet<DbId>,
    pub votes: BTreeMap<DbId, Ballot>,
    pub result: Option<DecisionResult>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Decision {
    /// Whether the voting deadline has passed at `now`.
    pub fn deadline_passed(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Stored status with lazy expiry applied.
    ///
    /// An active tiered decision whose deadline has passed reads as
    /// `Expired`; the stored row is not touched.
    pub fn effective_status(&self, now: Timestamp) -> DecisionStatus {
        if self.status == DecisionStatus::Active
            && self.method == DecisionMethod::Tiered
            && self.deadline_passed(now)
        {
            DecisionStatus::Expired
        } else {
            self.status
        }
    }

    /// Return the snapshot with [`effective_status`](Self::effective_status)
    /// written into `status`.
    pub fn observed_at(mut self, now: Timestamp) -> Self {
        self.status = self.effective_status(now);
        self
    }

    pub fn is_participant(&self, user_id: DbId) -> bool {
        self.participants.contains(&user_id)
    }

    /// Whether `result` is set exactly when the decision is completed.
    pub fn result_matches_status(&self) -> bool {
        self.result.is_some() == (self.status == DecisionStatus::Completed)
    }
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Validate a ballot against the decision's collection.
pub fn validate_rankings(rankings: &[DbId], collection: &[DbId]) -> Result<(), CoreError> {
    if rankings.is_empty() {
        return Err(CoreError::InvalidRankings(
            "Rank at least one restaurant".to_string(),
        ));
    }
    if rankings.len() > MAX_RANKINGS {
        return Err(CoreError::InvalidRankings(format!(
            "Rank at most {MAX_RANKINGS} restaurants, got {}",
            rankings.len()
        )));
    }
    let mut seen = BTreeSet::new();
    for id in rankings {
        if !seen.insert(*id) {
            return Err(CoreError::InvalidRankings(format!(
                "Restaurant {id} is ranked more than once"
            )));
        }
        if !collection.contains(id) {
            return Err(CoreError::InvalidRankings(format!(
                "Restaurant {id} is not in this collection"
            )));
        }
    }
    Ok(())
}

/// Check that `user_id` may cast or replace a ballot at `now`.
pub fn ensure_can_vote(
    decision: &Decision,
    user_id: DbId,
    now: Timestamp,
) -> Result<(), CoreError> {
    if !decision.is_participant(user_id) {
        return Err(CoreError::NotParticipant);
    }
    if decision.status.is_terminal() {
        return Err(CoreError::NotActive);
    }
    if decision.deadline_passed(now) {
        return Err(CoreError::Expired);
    }
    Ok(())
}

/// Check that a tiered decision may be completed by the acting user.
pub fn ensure_can_complete(
    decision: &Decision,
    acting_user_is_admin: bool,
    now: Timestamp,
) -> Result<(), CoreError> {
    if decision.status.is_terminal() {
        return Err(CoreError::AlreadyResolved);
    }
    if decision.method != DecisionMethod::Tiered {
        return Err(CoreError::Validation(
            "Only tiered decisions are completed by vote".to_string(),
        ));
    }
    if !acting_user_is_admin {
        return Err(CoreError::NotAuthorized);
    }
    if decision.deadline_passed(now) {
        return Err(CoreError::Expired);
    }
    if decision.votes.is_empty() {
        return Err(CoreError::NoVotes);
    }
    Ok(())
}

/// Check that the acting user may close a decision without a result.
pub fn ensure_can_close(
    decision: &Decision,
    acting_user_is_admin: bool,
    now: Timestamp,
) -> Result<(), CoreError> {
    if decision.effective_status(now).is_terminal() {
        return Err(CoreError::AlreadyResolved);
    }
    if !acting_user_is_admin {
        return Err(CoreError::NotAuthorized);
    }
    Ok(())
}

/// Validate a requested voting window, falling back to `default_hours`.
pub fn resolve_deadline_hours(
    requested: Option<i64>,
    default_hours: i64,
) -> Result<i64, CoreError> {
    let hours = requested.unwrap_or(default_hours);
    if !(MIN_DEADLINE_HOURS..=MAX_DEADLINE_HOURS).contains(&hours) {
        return Err(CoreError::Validation(format!(
            "deadline_hours must be between {MIN_DEADLINE_HOURS} and {MAX_DEADLINE_HOURS}, got {hours}"
        )));
    }
    Ok(hours)
}

// ---------------------------------------------------------------------------
// Display filtering
// ---------------------------------------------------------------------------

/// Whether a decision belongs in the primary list at `now`.
pub fn is_visible(decision: &Decision, now: Timestamp) -> bool {
    match decision.effective_status(now) {
        DecisionStatus::Active => true,
        DecisionStatus::Completed => {
            now - decision.visit_date <= Duration::hours(COMPLETED_VISIBLE_HOURS)
        }
        DecisionStatus::Expired | DecisionStatus::Closed => false,
    }
}

/// Filter decisions for the primary list, applying lazy expiry.
pub fn list_visible(
    decisions: impl IntoIterator<Item = Decision>,
    now: Timestamp,
) -> Vec<Decision> {
    decisions
        .into_iter()
        .filter(|d| is_visible(d, now))
        .map(|d| d.observed_at(now))
        .collect()
}

/// Resolved decisions (completed, expired, closed) for history views.
pub fn list_history(
    decisions: impl IntoIterator<Item = Decision>,
    now: Timestamp,
) -> Vec<Decision> {
    decisions
        .into_iter()
        .map(|d| d.observed_at(now))
        .filter(|d| d.status.is_terminal())
        .collect()
}
