//! Repository for the `selection_records` table (the weight store).
//!
//! `record_selection` is the only mutator. It is one upsert statement, so
//! concurrent selections of the same restaurant never lose an increment.

use std::collections::HashMap;

use platepick_core::types::{DbId, Timestamp};
use platepick_core::weight::weight_at;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::selection_record::{RestaurantHistory, SelectionRecord};

/// Column list for selection_records queries.
const COLUMNS: &str = "collection_id, restaurant_id, selection_count, last_selected_at";

const UPSERT: &str = "INSERT INTO selection_records
        (collection_id, restaurant_id, selection_count, last_selected_at)
     VALUES ($1, $2, 1, $3)
     ON CONFLICT (collection_id, restaurant_id) DO UPDATE
        SET selection_count = selection_records.selection_count + 1,
            last_selected_at = EXCLUDED.last_selected_at
     RETURNING collection_id, restaurant_id, selection_count, last_selected_at";

/// Provides selection history reads and the atomic selection upsert.
pub struct SelectionRecordRepo;

impl SelectionRecordRepo {
    /// Find the record for one restaurant, if it was ever selected.
    pub async fn find(
        pool: &PgPool,
        collection_id: DbId,
        restaurant_id: DbId,
    ) -> Result<Option<SelectionRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM selection_records
             WHERE collection_id = $1 AND restaurant_id = $2"
        );
        sqlx::query_as::<_, SelectionRecord>(&query)
            .bind(collection_id)
            .bind(restaurant_id)
            .fetch_optional(pool)
            .await
    }

    /// Current selection weight in `[0.1, 1.0]`.
    pub async fn get_weight(
        pool: &PgPool,
        collection_id: DbId,
        restaurant_id: DbId,
        now: Timestamp,
    ) -> Result<f64, sqlx::Error> {
        let record = Self::find(pool, collection_id, restaurant_id).await?;
        Ok(weight_at(record.and_then(|r| r.last_selected_at), now))
    }

    /// Increment the count and set the last selection time, creating the
    /// record on first selection.
    pub async fn record_selection(
        pool: &PgPool,
        collection_id: DbId,
        restaurant_id: DbId,
        at: Timestamp,
    ) -> Result<SelectionRecord, sqlx::Error> {
        sqlx::query_as::<_, SelectionRecord>(UPSERT)
            .bind(collection_id)
            .bind(restaurant_id)
            .bind(at)
            .fetch_one(pool)
            .await
    }

    /// Same as [`record_selection`](Self::record_selection) inside an open transaction.
    pub async fn record_selection_tx(
        tx: &mut Transaction<'_, Postgres>,
        collection_id: DbId,
        restaurant_id: DbId,
        at: Timestamp,
    ) -> Result<SelectionRecord, sqlx::Error> {
        sqlx::query_as::<_, SelectionRecord>(UPSERT)
            .bind(collection_id)
            .bind(restaurant_id)
            .bind(at)
            .fetch_one(&mut **tx)
            .await
    }

    /// All records for a collection, including restaurants since removed.
    pub async fn list_for_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Vec<SelectionRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM selection_records
             WHERE collection_id = $1
             ORDER BY restaurant_id ASC"
        );
        sqlx::query_as::<_, SelectionRecord>(&query)
            .bind(collection_id)
            .fetch_all(pool)
            .await
    }

    /// Every restaurant currently in the collection with its history, in
    /// insertion order. This is the candidate set for a random draw.
    pub async fn list_history_for_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Vec<RestaurantHistory>, sqlx::Error> {
        sqlx::query_as::<_, RestaurantHistory>(
            "SELECT cr.restaurant_id,
                    COALESCE(sr.selection_count, 0) AS selection_count,
                    sr.last_selected_at
             FROM collection_restaurants cr
             LEFT JOIN selection_records sr
                    ON sr.collection_id = cr.collection_id
                   AND sr.restaurant_id = cr.restaurant_id
             WHERE cr.collection_id = $1
             ORDER BY cr.position ASC",
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await
    }

    /// Selection counts keyed by restaurant id, for tally tie-breaks.
    pub async fn counts_for_collection_tx(
        tx: &mut Transaction<'_, Postgres>,
        collection_id: DbId,
    ) -> Result<HashMap<DbId, i32>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (DbId, i32)>(
            "SELECT restaurant_id, selection_count FROM selection_records
             WHERE collection_id = $1",
        )
        .bind(collection_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
