//! Weighted random restaurant selection.
//!
//! Candidates are captured once (weight plus prior selection count) and the
//! same captured values drive both the draw and the reasoning attached to
//! the result, so what users read is exactly what was used.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};
use crate::weight::weight_at;

/// One restaurant eligible for a random draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub restaurant_id: DbId,
    pub weight: f64,
    pub previous_selections: i32,
}

impl Candidate {
    /// Build a candidate from its selection history as of `now`.
    pub fn from_history(
        restaurant_id: DbId,
        previous_selections: i32,
        last_selected_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Self {
        Self {
            restaurant_id,
            weight: weight_at(last_selected_at, now),
            previous_selections,
        }
    }
}

/// Structured explanation of a random pick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionReasoning {
    pub weight: f64,
    pub previous_selections: i32,
}

impl fmt::Display for SelectionReasoning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Selected using weighted random algorithm. Weight: {:.2}, Previous selections: {}",
            self.weight, self.previous_selections
        )
    }
}

/// Outcome of [`weighted_pick`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub restaurant_id: DbId,
    pub reasoning: SelectionReasoning,
    /// `true` when the weights were degenerate and a uniform draw was used.
    pub uniform_fallback: bool,
}

impl Pick {
    fn from_candidate(candidate: &Candidate, uniform_fallback: bool) -> Self {
        Self {
            restaurant_id: candidate.restaurant_id,
            reasoning: SelectionReasoning {
                weight: candidate.weight,
                previous_selections: candidate.previous_selections,
            },
            uniform_fallback,
        }
    }
}

/// Draw one candidate using cumulative-sum weighted sampling.
///
/// A uniform value in `[0, total)` is drawn and the candidates are walked in
/// the order given; the first whose cumulative weight exceeds the draw wins.
/// When the total weight is not a positive finite number the draw falls back
/// to a uniform pick over all candidates.
pub fn weighted_pick<R: Rng + ?Sized>(
    candidates: &[Candidate],
    rng: &mut R,
) -> Result<Pick, CoreError> {
    if candidates.is_empty() {
        return Err(CoreError::EmptyCandidateSet);
    }

    let total: f64 = candidates.iter().map(|c| effective_weight(c.weight)).sum();
    if !(total.is_finite() && total > 0.0) {
        let index = rng.random_range(0..candidates.len());
        return Ok(Pick::from_candidate(&candidates[index], true));
    }

    let draw = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for candidate in candidates {
        cumulative += effective_weight(candidate.weight);
        if cumulative > draw {
            return Ok(Pick::from_candidate(candidate, false));
        }
    }

    // Rounding can leave the draw a hair above the final cumulative sum.
    candidates
        .iter()
        .rev()
        .find(|c| effective_weight(c.weight) > 0.0)
        .map(|c| Pick::from_candidate(c, false))
        .ok_or(CoreError::EmptyCandidateSet)
}

fn effective_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn candidate(id: DbId, weight: f64, previous: i32) -> Candidate {
        Candidate {
            restaurant_id: id,
            weight,
            previous_selections: previous,
        }
    }

    fn counts(candidates: &[Candidate], draws: usize, seed: u64) -> HashMap<DbId, usize> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut counts = HashMap::new();
        for _ in 0..draws {
            let pick = weighted_pick(candidates, &mut rng).unwrap();
            *counts.entry(pick.restaurant_id).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn empty_candidates_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_matches!(weighted_pick(&[], &mut rng), Err(CoreError::EmptyCandidateSet));
    }

    #[test]
    fn single_candidate_always_wins() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = [candidate(5, 0.1, 3)];
        for _ in 0..50 {
            assert_eq!(weighted_pick(&candidates, &mut rng).unwrap().restaurant_id, 5);
        }
    }

    #[test]
    fn bias_follows_weights() {
        let candidates = [candidate(1, 1.0, 0), candidate(2, 0.1, 1)];
        let counts = counts(&candidates, 10_000, 42);
        let heavy = counts[&1] as f64;
        let light = counts[&2] as f64;
        let ratio = heavy / light;
        assert!((8.0..12.0).contains(&ratio), "ratio was {ratio}");
    }

    #[test]
    fn never_selected_beats_just_selected_about_ninety_one_percent() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 19, 0, 0).unwrap();
        let candidates = [
            Candidate::from_history(1, 0, None, now),
            Candidate::from_history(2, 1, Some(now), now),
        ];
        let counts = counts(&candidates, 20_000, 2026);
        let share = counts[&1] as f64 / 20_000.0;
        assert!((share - 1.0 / 1.1).abs() < 0.02, "share was {share}");
    }

    #[test]
    fn zero_weight_candidate_is_never_drawn() {
        let candidates = [candidate(1, 0.0, 0), candidate(2, 0.5, 0)];
        let counts = counts(&candidates, 2_000, 9);
        assert_eq!(counts.get(&1), None);
        assert_eq!(counts[&2], 2_000);
    }

    #[test]
    fn degenerate_weights_fall_back_to_uniform() {
        let candidates = [candidate(1, 0.0, 0), candidate(2, 0.0, 0), candidate(3, f64::NAN, 0)];
        let mut rng = StdRng::seed_from_u64(3);
        let pick = weighted_pick(&candidates, &mut rng).unwrap();
        assert!(pick.uniform_fallback);

        let counts = counts(&candidates, 3_000, 11);
        for id in 1..=3 {
            assert!(counts[&id] > 800, "candidate {id} drawn {} times", counts[&id]);
        }
    }

    #[test]
    fn reasoning_reflects_the_drawn_candidate() {
        let candidates = [candidate(10, 0.85, 2)];
        let mut rng = StdRng::seed_from_u64(5);
        let pick = weighted_pick(&candidates, &mut rng).unwrap();
        assert_eq!(pick.reasoning.weight, 0.85);
        assert_eq!(pick.reasoning.previous_selections, 2);
        assert_eq!(
            pick.reasoning.to_string(),
            "Selected using weighted random algorithm. Weight: 0.85, Previous selections: 2"
        );
    }
}
