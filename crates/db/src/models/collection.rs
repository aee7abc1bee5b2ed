//! Restaurant collection models.

use platepick_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `collections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Collection {
    pub id: DbId,
    pub name: String,
    pub owner_user_id: Option<DbId>,
    pub owner_group_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Collection {
    /// Whether a decision in `group_id` (or a personal decision when `None`)
    /// created by `user_id` may draw from this collection.
    ///
    /// Group membership of `user_id` is checked separately.
    pub fn usable_by(&self, user_id: DbId, group_id: Option<DbId>) -> bool {
        match group_id {
            Some(group_id) => {
                self.owner_group_id == Some(group_id) || self.owner_user_id == Some(user_id)
            }
            None => self.owner_user_id == Some(user_id),
        }
    }
}

/// DTO for creating a collection. Exactly one owner must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollection {
    pub name: String,
    pub owner_user_id: Option<DbId>,
    pub owner_group_id: Option<DbId>,
}
