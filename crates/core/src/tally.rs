//! Ranked-choice tally for tiered decisions.
//!
//! Each ballot ranks up to three restaurants. First choice earns 3 points,
//! second 2, third 1. The winner has the most points; ties are broken by
//! first-choice votes, then by fewer past selections from the collection,
//! then by the lower restaurant id.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum number of restaurants a ballot may rank.
pub const MAX_RANKINGS: usize = 3;

/// Points awarded per ballot position.
pub const POINTS_BY_POSITION: [u32; MAX_RANKINGS] = [3, 2, 1];

/// Aggregate score for one restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub restaurant_id: DbId,
    pub points: u32,
    pub first_choice_votes: u32,
    pub previous_selections: i32,
}

/// Which rule separated the winner from the runner-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    FirstChoiceVotes,
    SelectionHistory,
    RestaurantId,
}

/// Structured explanation of a tally result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyReasoning {
    pub points: u32,
    /// Points ahead of the runner-up; `None` when nobody else scored.
    pub margin: Option<u32>,
    pub first_choice_votes: u32,
    pub ballots: usize,
    pub tie_break: Option<TieBreak>,
}

impl fmt::Display for TallyReasoning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Most popular choice among group members: {} points across {} ballot{}",
            self.points,
            self.ballots,
            if self.ballots == 1 { "" } else { "s" }
        )?;
        match (self.margin, self.tie_break) {
            (None, _) => write!(f, ", unopposed"),
            (Some(_), Some(TieBreak::FirstChoiceVotes)) => {
                write!(f, ", tied on points and won on first-choice votes")
            }
            (Some(_), Some(TieBreak::SelectionHistory)) => {
                write!(f, ", tied and won as the less frequently chosen restaurant")
            }
            (Some(_), Some(TieBreak::RestaurantId)) => write!(f, ", tied and won on list order"),
            (Some(margin), None) => write!(f, ", {margin} ahead of the runner-up"),
        }
    }
}

/// Result of [`tally`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyOutcome {
    pub winner_id: DbId,
    pub reasoning: TallyReasoning,
    /// All scored restaurants, best first.
    pub standings: Vec<Standing>,
}

/// Score a set of ballots and pick the winner.
///
/// `selection_counts` maps restaurant id to its selection history count in
/// the decision's collection; missing entries count as never selected.
/// The outcome depends only on the multiset of ballots, not on the order
/// they are supplied in.
pub fn tally<'a, I>(
    ballots: I,
    selection_counts: &HashMap<DbId, i32>,
) -> Result<TallyOutcome, CoreError>
where
    I: IntoIterator<Item = &'a [DbId]>,
{
    let mut scores: BTreeMap<DbId, (u32, u32)> = BTreeMap::new();
    let mut ballot_count = 0usize;

    for rankings in ballots {
        ballot_count += 1;
        for (position, restaurant_id) in rankings.iter().take(MAX_RANKINGS).enumerate() {
            let entry = scores.entry(*restaurant_id).or_insert((0, 0));
            entry.0 += POINTS_BY_POSITION[position];
            if position == 0 {
                entry.1 += 1;
            }
        }
    }

    let mut standings: Vec<Standing> = scores
        .into_iter()
        .map(|(restaurant_id, (points, first_choice_votes))| Standing {
            restaurant_id,
            points,
            first_choice_votes,
            previous_selections: selection_counts.get(&restaurant_id).copied().unwrap_or(0),
        })
        .collect();
    standings.sort_by(rank_order);

    let winner = standings.first().ok_or(CoreError::NoWinner)?;
    let runner_up = standings.get(1);

    let reasoning = TallyReasoning {
        points: winner.points,
        margin: runner_up.map(|r| winner.points - r.points),
        first_choice_votes: winner.first_choice_votes,
        ballots: ballot_count,
        tie_break: runner_up.and_then(|r| deciding_tie_break(winner, r)),
    };

    Ok(TallyOutcome {
        winner_id: winner.restaurant_id,
        reasoning,
        standings,
    })
}

/// Best standing first.
fn rank_order(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.first_choice_votes.cmp(&a.first_choice_votes))
        .then_with(|| a.previous_selections.cmp(&b.previous_selections))
        .then_with(|| a.restaurant_id.cmp(&b.restaurant_id))
}

fn deciding_tie_break(winner: &Standing, runner_up: &Standing) -> Option<TieBreak> {
    if winner.points != runner_up.points {
        None
    } else if winner.first_choice_votes != runner_up.first_choice_votes {
        Some(TieBreak::FirstChoiceVotes)
    } else if winner.previous_selections != runner_up.previous_selections {
        Some(TieBreak::SelectionHistory)
    } else {
        Some(TieBreak::RestaurantId)
    }
}
