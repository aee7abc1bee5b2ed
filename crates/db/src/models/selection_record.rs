//! Selection history models.

use platepick_core::selection::Candidate;
use platepick_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `selection_records` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct SelectionRecord {
    pub collection_id: DbId,
    pub restaurant_id: DbId,
    pub selection_count: i32,
    pub last_selected_at: Option<Timestamp>,
}

/// A collection restaurant joined with its (possibly absent) selection record.
///
/// Restaurants never selected report a count of zero and no timestamp.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct RestaurantHistory {
    pub restaurant_id: DbId,
    pub selection_count: i32,
    pub last_selected_at: Option<Timestamp>,
}

impl RestaurantHistory {
    pub fn to_candidate(&self, now: Timestamp) -> Candidate {
        Candidate::from_history(
            self.restaurant_id,
            self.selection_count,
            self.last_selected_at,
            now,
        )
    }
}
