//! Repository for the `groups` and `group_members` tables.

use platepick_core::types::DbId;
use sqlx::PgPool;

use crate::models::group::{CreateGroup, Group, GroupMember, ROLE_ADMIN};

/// Column list for groups queries.
const COLUMNS: &str = "id, name, created_by, created_at, updated_at";

/// Column list for group_members queries.
const MEMBER_COLUMNS: &str = "group_id, user_id, role, joined_at";

/// Provides group and membership operations.
pub struct GroupRepo;

impl GroupRepo {
    /// Create a group and enrol its creator as admin.
    pub async fn create(pool: &PgPool, input: &CreateGroup) -> Result<Group, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO groups (name, created_by) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let group = sqlx::query_as::<_, Group>(&query)
            .bind(&input.name)
            .bind(input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO group_members (group_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(group.id)
            .bind(input.created_by)
            .bind(ROLE_ADMIN)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(group)
    }

    /// Find a group by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Group>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM groups WHERE id = $1");
        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Add a member or change an existing member's role.
    pub async fn upsert_member(
        pool: &PgPool,
        group_id: DbId,
        user_id: DbId,
        role: &str,
    ) -> Result<GroupMember, sqlx::Error> {
        let query = format!(
            "INSERT INTO group_members (group_id, user_id, role)
             VALUES ($1, $2, $3)
             ON CONFLICT (group_id, user_id) DO UPDATE SET role = EXCLUDED.role
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, GroupMember>(&query)
            .bind(group_id)
            .bind(user_id)
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Find one membership.
    pub async fn find_member(
        pool: &PgPool,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<Option<GroupMember>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, GroupMember>(&query)
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Current member ids, ascending.
    pub async fn list_member_ids(pool: &PgPool, group_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT user_id FROM group_members WHERE group_id = $1 ORDER BY user_id ASC",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    /// Whether `user_id` is an admin of `group_id`.
    pub async fn is_admin(
        pool: &PgPool,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        Ok(Self::find_member(pool, group_id, user_id)
            .await?
            .is_some_and(|m| m.is_admin()))
    }
}
