//! Repository for the `collections` and `collection_restaurants` tables.

use platepick_core::types::DbId;
use sqlx::PgPool;

use crate::models::collection::{Collection, CreateCollection};

/// Column list for collections queries.
const COLUMNS: &str = "id, name, owner_user_id, owner_group_id, created_at, updated_at";

/// Provides CRUD operations for restaurant collections.
pub struct CollectionRepo;

impl CollectionRepo {
    /// Insert a new collection, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateCollection,
    ) -> Result<Collection, sqlx::Error> {
        let query = format!(
            "INSERT INTO collections (name, owner_user_id, owner_group_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Collection>(&query)
            .bind(&input.name)
            .bind(input.owner_user_id)
            .bind(input.owner_group_id)
            .fetch_one(pool)
            .await
    }

    /// Find a collection by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Collection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM collections WHERE id = $1");
        sqlx::query_as::<_, Collection>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Add a restaurant to a collection.
    ///
    /// Returns `false` if it was already a member.
    pub async fn add_restaurant(
        pool: &PgPool,
        collection_id: DbId,
        restaurant_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO collection_restaurants (collection_id, restaurant_id)
             VALUES ($1, $2)
             ON CONFLICT (collection_id, restaurant_id) DO NOTHING",
        )
        .bind(collection_id)
        .bind(restaurant_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a restaurant from a collection. Its selection history is kept.
    pub async fn remove_restaurant(
        pool: &PgPool,
        collection_id: DbId,
        restaurant_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM collection_restaurants
             WHERE collection_id = $1 AND restaurant_id = $2",
        )
        .bind(collection_id)
        .bind(restaurant_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Restaurant ids in the order they were added.
    pub async fn list_restaurant_ids(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT restaurant_id FROM collection_restaurants
             WHERE collection_id = $1
             ORDER BY position ASC",
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await
    }
}
