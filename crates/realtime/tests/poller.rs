//! Polling fallback against a mock server.

use std::collections::{BTreeMap, BTreeSet};

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use platepick_core::decision::{Decision, DecisionMethod, DecisionScope, DecisionStatus};
use platepick_realtime::poller::DecisionPoller;
use platepick_realtime::RealtimeError;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn decision(id: i64) -> Decision {
    let now = Utc::now();
    Decision {
        id,
        scope: DecisionScope::Group,
        group_id: Some(4),
        created_by: 1,
        collection_id: 2,
        method: DecisionMethod::Tiered,
        status: DecisionStatus::Active,
        deadline: Some(now + Duration::hours(24)),
        visit_date: now,
        participants: BTreeSet::from([1, 2]),
        votes: BTreeMap::new(),
        result: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn fetch_group_unwraps_data_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups/4/decisions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [decision(1), decision(2)] })),
        )
        .mount(&server)
        .await;

    let poller = DecisionPoller::new(server.uri());
    let decisions = poller.fetch_group(4).await.unwrap();

    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0].id, 1);
    assert_eq!(decisions[1].id, 2);
    assert_eq!(decisions[0].participants, BTreeSet::from([1, 2]));
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups/4/decisions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let err = DecisionPoller::new(server.uri()).fetch_group(4).await.unwrap_err();

    assert_matches!(
        err,
        RealtimeError::PollStatus { status: 503, ref body } if body == "try later"
    );
}

#[tokio::test]
async fn malformed_body_is_a_poll_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups/4/decisions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let err = DecisionPoller::new(server.uri()).fetch_group(4).await.unwrap_err();

    assert_matches!(err, RealtimeError::Poll(_));
}
