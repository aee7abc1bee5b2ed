//! Integration tests for decision persistence and conditional transitions.

use std::collections::BTreeSet;

use assert_matches::assert_matches;
use chrono::{Duration, DurationRound, Utc};
use platepick_core::decision::{
    DecisionMethod, DecisionResult, DecisionScope, DecisionStatus, ResultDetail,
};
use platepick_core::selection::SelectionReasoning;
use platepick_core::sync::{ApplyOutcome, SnapshotStore};
use platepick_core::types::Timestamp;
use platepick_db::models::collection::CreateCollection;
use platepick_db::models::decision::NewDecision;
use platepick_db::models::group::{CreateGroup, ROLE_MEMBER};
use platepick_db::repositories::{CollectionRepo, DecisionRepo, GroupRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now() -> Timestamp {
    Utc::now().duration_trunc(Duration::microseconds(1)).unwrap()
}

struct Seed {
    group_id: i64,
    collection_id: i64,
}

async fn seed(pool: &PgPool) -> Seed {
    let group = GroupRepo::create(
        pool,
        &CreateGroup {
            name: "Lunch crew".to_string(),
            created_by: 1,
        },
    )
    .await
    .unwrap();
    GroupRepo::upsert_member(pool, group.id, 2, ROLE_MEMBER).await.unwrap();
    let collection = CollectionRepo::create(
        pool,
        &CreateCollection {
            name: "Downtown".to_string(),
            owner_user_id: None,
            owner_group_id: Some(group.id),
        },
    )
    .await
    .unwrap();
    for id in [10, 20, 30] {
        CollectionRepo::add_restaurant(pool, collection.id, id).await.unwrap();
    }
    Seed {
        group_id: group.id,
        collection_id: collection.id,
    }
}

fn tiered(seed: &Seed, at: Timestamp) -> NewDecision {
    NewDecision {
        scope: DecisionScope::Group,
        group_id: Some(seed.group_id),
        created_by: 1,
        collection_id: seed.collection_id,
        method: DecisionMethod::Tiered,
        status: DecisionStatus::Active,
        deadline: Some(at + Duration::hours(24)),
        visit_date: at + Duration::days(1),
        participants: vec![1, 2],
        result: None,
        created_at: at,
    }
}

async fn insert(pool: &PgPool, input: &NewDecision) -> platepick_core::decision::Decision {
    let mut tx = pool.begin().await.unwrap();
    let decision = DecisionRepo::insert(&mut tx, input).await.unwrap();
    tx.commit().await.unwrap();
    decision
}

fn random_result(at: Timestamp) -> DecisionResult {
    DecisionResult::new(
        20,
        at,
        ResultDetail::Random(SelectionReasoning {
            weight: 1.0,
            previous_selections: 0,
        }),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_and_find_tiered(pool: PgPool) {
    let seed = seed(&pool).await;
    let at = now();
    let created = insert(&pool, &tiered(&seed, at)).await;

    assert_eq!(created.status, DecisionStatus::Active);
    assert_eq!(created.participants, BTreeSet::from([1, 2]));
    assert!(created.votes.is_empty());
    assert!(created.result.is_none());

    let found = DecisionRepo::find_by_id(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(found, created);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_completed_random_round_trips_result(pool: PgPool) {
    let seed = seed(&pool).await;
    let at = now();
    let mut input = tiered(&seed, at);
    input.method = DecisionMethod::Random;
    input.status = DecisionStatus::Completed;
    input.deadline = None;
    input.result = Some(random_result(at));

    let created = insert(&pool, &input).await;
    let result = created.result.clone().unwrap();
    assert_eq!(result.restaurant_id, 20);
    assert_eq!(
        result.reasoning,
        "Selected using weighted random algorithm. Weight: 1.00, Previous selections: 0"
    );
    assert_matches!(result.detail, ResultDetail::Random(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completed_without_result_is_rejected(pool: PgPool) {
    let seed = seed(&pool).await;
    let mut input = tiered(&seed, now());
    input.status = DecisionStatus::Completed;

    let mut tx = pool.begin().await.unwrap();
    let err = DecisionRepo::insert(&mut tx, &input).await.unwrap_err();
    assert_matches!(err, sqlx::Error::Database(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_vote_resubmission_replaces_ballot(pool: PgPool) {
    let seed = seed(&pool).await;
    let at = now();
    let decision = insert(&pool, &tiered(&seed, at)).await;

    let mut tx = pool.begin().await.unwrap();
    DecisionRepo::lock_for_update(&mut tx, decision.id).await.unwrap();
    DecisionRepo::upsert_vote(&mut tx, decision.id, 2, &[10, 20], at + Duration::minutes(1))
        .await
        .unwrap();
    let updated = DecisionRepo::upsert_vote(
        &mut tx,
        decision.id,
        2,
        &[30],
        at + Duration::minutes(2),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(updated.votes.len(), 1);
    assert_eq!(updated.votes[&2].rankings, vec![30]);
    assert_eq!(updated.updated_at, at + Duration::minutes(2));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_complete_only_once(pool: PgPool) {
    let seed = seed(&pool).await;
    let at = now();
    let decision = insert(&pool, &tiered(&seed, at)).await;
    let result = random_result(at);

    let mut tx = pool.begin().await.unwrap();
    assert!(DecisionRepo::complete_if_active(&mut tx, decision.id, &result, at)
        .await
        .unwrap());
    assert!(!DecisionRepo::complete_if_active(&mut tx, decision.id, &result, at)
        .await
        .unwrap());
    tx.commit().await.unwrap();

    assert!(!DecisionRepo::close_if_active(&pool, decision.id, at).await.unwrap());
    let found = DecisionRepo::find_by_id(&pool, decision.id).await.unwrap().unwrap();
    assert_eq!(found.status, DecisionStatus::Completed);
    assert!(found.result_matches_status());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completion_with_lagging_clock_still_advances_updated_at(pool: PgPool) {
    let seed = seed(&pool).await;
    let at = now();
    let decision = insert(&pool, &tiered(&seed, at)).await;

    // A competing vote commits with a clock reading ahead of the completer's.
    let mut tx = pool.begin().await.unwrap();
    let voted = DecisionRepo::upsert_vote(
        &mut tx,
        decision.id,
        2,
        &[10],
        at + Duration::milliseconds(5),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    assert!(DecisionRepo::complete_if_active(&mut tx, decision.id, &random_result(at), at)
        .await
        .unwrap());
    tx.commit().await.unwrap();
    let completed = DecisionRepo::find_by_id(&pool, decision.id).await.unwrap().unwrap();

    assert!(completed.updated_at > voted.updated_at);

    let mut store = SnapshotStore::new();
    store.apply(voted);
    assert_eq!(store.apply(completed), ApplyOutcome::Replaced);
    assert_eq!(store.get(decision.id).unwrap().status, DecisionStatus::Completed);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_votes_with_same_clock_reading_get_distinct_stamps(pool: PgPool) {
    let seed = seed(&pool).await;
    let at = now();
    let decision = insert(&pool, &tiered(&seed, at)).await;

    let mut tx = pool.begin().await.unwrap();
    let first = DecisionRepo::upsert_vote(&mut tx, decision.id, 1, &[10], at).await.unwrap();
    let second = DecisionRepo::upsert_vote(&mut tx, decision.id, 2, &[20], at).await.unwrap();
    tx.commit().await.unwrap();

    assert!(first.updated_at > decision.updated_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.votes.len(), 2);

    assert!(DecisionRepo::close_if_active(&pool, decision.id, at).await.unwrap());
    let closed = DecisionRepo::find_by_id(&pool, decision.id).await.unwrap().unwrap();
    assert!(closed.updated_at > second.updated_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_close_refuses_after_deadline(pool: PgPool) {
    let seed = seed(&pool).await;
    let at = now();
    let decision = insert(&pool, &tiered(&seed, at)).await;

    let later = at + Duration::hours(25);
    assert!(!DecisionRepo::close_if_active(&pool, decision.id, later).await.unwrap());
    assert!(DecisionRepo::close_if_active(&pool, decision.id, at).await.unwrap());

    let found = DecisionRepo::find_by_id(&pool, decision.id).await.unwrap().unwrap();
    assert_eq!(found.status, DecisionStatus::Closed);
    assert!(found.result.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_for_group_newest_first_with_votes(pool: PgPool) {
    let seed = seed(&pool).await;
    let at = now();
    let older = insert(&pool, &tiered(&seed, at - Duration::hours(1))).await;
    let newer = insert(&pool, &tiered(&seed, at)).await;

    let mut tx = pool.begin().await.unwrap();
    DecisionRepo::lock_for_update(&mut tx, older.id).await.unwrap();
    DecisionRepo::upsert_vote(&mut tx, older.id, 1, &[10], at).await.unwrap();
    tx.commit().await.unwrap();

    let listed = DecisionRepo::list_for_group(&pool, seed.group_id).await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert!(listed[0].votes.is_empty());
    assert_eq!(listed[1].votes[&1].rankings, vec![10]);

    let mine = DecisionRepo::list_for_participant(&pool, 2).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(
        DecisionRepo::count_for_collection(&pool, seed.collection_id).await.unwrap(),
        2
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_group_creator_is_admin(pool: PgPool) {
    let seed = seed(&pool).await;
    assert!(GroupRepo::is_admin(&pool, seed.group_id, 1).await.unwrap());
    assert!(!GroupRepo::is_admin(&pool, seed.group_id, 2).await.unwrap());
    assert!(!GroupRepo::is_admin(&pool, seed.group_id, 99).await.unwrap());
    assert_eq!(
        GroupRepo::list_member_ids(&pool, seed.group_id).await.unwrap(),
        vec![1, 2]
    );
}
