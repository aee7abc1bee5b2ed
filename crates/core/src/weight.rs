//! Recency-decayed selection weights.
//!
//! A restaurant that was just picked from a collection is strongly
//! suppressed and recovers over roughly a month:
//!
//! ```text
//! elapsed days   weight
//! never          1.0
//! [0, 1)         0.1
//! [1, 7)         0.1 -> 0.5   (linear)
//! [7, 30)        0.5 -> 0.95  (linear)
//! >= 30          1.0
//! ```

use crate::types::Timestamp;

/// Weight of a restaurant that has never been selected (maximum likelihood).
pub const MAX_WEIGHT: f64 = 1.0;

/// Weight of a restaurant selected less than a day ago.
pub const MIN_WEIGHT: f64 = 0.1;

/// Weight reached at the end of the first week.
const WEEK_WEIGHT: f64 = 0.5;

/// Weight approached at the end of the first month.
const MONTH_WEIGHT: f64 = 0.95;

const SUPPRESSED_DAYS: f64 = 1.0;
const WEEK_DAYS: f64 = 7.0;
const MONTH_DAYS: f64 = 30.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days between `since` and `now`, clamped at zero.
pub fn elapsed_days(since: Timestamp, now: Timestamp) -> f64 {
    let millis = (now - since).num_milliseconds() as f64;
    (millis / MILLIS_PER_DAY).max(0.0)
}

/// Weight for a restaurant last selected `days` ago.
pub fn weight_for_elapsed_days(days: f64) -> f64 {
    if days < SUPPRESSED_DAYS {
        MIN_WEIGHT
    } else if days < WEEK_DAYS {
        lerp(MIN_WEIGHT, WEEK_WEIGHT, (days - SUPPRESSED_DAYS) / (WEEK_DAYS - SUPPRESSED_DAYS))
    } else if days < MONTH_DAYS {
        lerp(WEEK_WEIGHT, MONTH_WEIGHT, (days - WEEK_DAYS) / (MONTH_DAYS - WEEK_DAYS))
    } else {
        MAX_WEIGHT
    }
}

/// Weight for a restaurant given its last selection time, if any.
pub fn weight_at(last_selected_at: Option<Timestamp>, now: Timestamp) -> f64 {
    match last_selected_at {
        None => MAX_WEIGHT,
        Some(at) => weight_for_elapsed_days(elapsed_days(at, now)),
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    const EPS: f64 = 1e-9;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn days_ago(days: f64) -> Timestamp {
        now() - Duration::milliseconds((days * MILLIS_PER_DAY) as i64)
    }

    #[test]
    fn never_selected_is_full_weight() {
        assert_eq!(weight_at(None, now()), 1.0);
    }

    #[test]
    fn just_selected_is_suppressed() {
        assert_eq!(weight_at(Some(now()), now()), 0.1);
        assert_eq!(weight_at(Some(days_ago(0.5)), now()), 0.1);
    }

    #[test]
    fn ramp_boundaries() {
        assert!((weight_for_elapsed_days(1.0) - 0.1).abs() < EPS);
        assert!((weight_for_elapsed_days(7.0) - 0.5).abs() < EPS);
        assert_eq!(weight_for_elapsed_days(30.0), 1.0);
    }

    #[test]
    fn ramp_is_continuous_approaching_boundaries() {
        assert!((weight_for_elapsed_days(7.0 - 1e-9) - 0.5).abs() < 1e-6);
        assert!((weight_for_elapsed_days(30.0 - 1e-9) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn ramp_midpoints() {
        assert!((weight_for_elapsed_days(4.0) - 0.3).abs() < EPS);
        assert!((weight_for_elapsed_days(18.5) - 0.725).abs() < EPS);
    }

    #[test]
    fn weight_is_monotonic_over_the_month() {
        let mut previous = weight_for_elapsed_days(0.0);
        for tenth in 1..=310 {
            let w = weight_for_elapsed_days(tenth as f64 / 10.0);
            assert!(w >= previous, "weight dropped at day {}", tenth as f64 / 10.0);
            previous = w;
        }
    }

    #[test]
    fn weight_stays_in_range() {
        for day in 0..100 {
            let w = weight_for_elapsed_days(day as f64);
            assert!((MIN_WEIGHT..=MAX_WEIGHT).contains(&w));
        }
    }

    #[test]
    fn future_selection_time_counts_as_just_selected() {
        let future = now() + Duration::hours(3);
        assert_eq!(elapsed_days(future, now()), 0.0);
        assert_eq!(weight_at(Some(future), now()), 0.1);
    }

    #[test]
    fn old_selection_recovers_fully() {
        assert_eq!(weight_at(Some(days_ago(45.0)), now()), 1.0);
    }
}
