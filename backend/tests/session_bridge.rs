//! Session continuity across the external authorization redirect.

use chrono::Duration;

use pulsy_backend::error::AppError;
use pulsy_backend::models::device::DeviceType;
use pulsy_backend::models::session::Session;

#[path = "support/mod.rs"]
mod support;

use support::{test_config, TestHarness};

fn session_with_history(username: &str) -> Session {
    let mut session = Session::new(username);
    session.push_turn(
        "How did I sleep?".to_string(),
        "Your sleep score was 82.".to_string(),
        Some(11),
    );
    session
}

#[tokio::test]
async fn stashed_session_survives_the_redirect_hop() {
    let harness = TestHarness::new(test_config());
    let session = session_with_history("nik");

    let (token, url) = harness
        .bridge
        .begin_external_redirect(&session, DeviceType::OuraRing)
        .await
        .expect("begin");

    // The browser leaves with only the state parameter; no cookie needed on
    // the way back.
    let query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert!(query.contains(&("state".to_string(), token.clone())));
    assert!(query.contains(&("response_type".to_string(), "code".to_string())));
    assert!(query.contains(&("client_id".to_string(), "test-client".to_string())));

    let restored = harness
        .bridge
        .complete_external_redirect(&token)
        .await
        .expect("complete");

    assert_eq!(restored.session, session);
    assert_eq!(restored.device_type, DeviceType::OuraRing);
}

#[tokio::test]
async fn correlation_token_is_single_use() {
    let harness = TestHarness::new(test_config());
    let session = session_with_history("nik");

    let (token, _) = harness
        .bridge
        .begin_external_redirect(&session, DeviceType::OuraRing)
        .await
        .expect("begin");

    harness
        .bridge
        .complete_external_redirect(&token)
        .await
        .expect("first redemption");

    // Replay of the same callback must not restore anything.
    let replay = harness.bridge.complete_external_redirect(&token).await;
    assert!(matches!(replay, Err(AppError::StateNotFound)));
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let harness = TestHarness::new(test_config());
    let result = harness
        .bridge
        .complete_external_redirect("never-issued")
        .await;
    assert!(matches!(result, Err(AppError::StateNotFound)));
}

#[tokio::test]
async fn each_begin_gets_a_distinct_token() {
    let harness = TestHarness::new(test_config());
    let session = session_with_history("nik");

    let (first, _) = harness
        .bridge
        .begin_external_redirect(&session, DeviceType::OuraRing)
        .await
        .expect("begin");
    let (second, _) = harness
        .bridge
        .begin_external_redirect(&session, DeviceType::OuraRing)
        .await
        .expect("begin again");

    assert_ne!(first, second);
    assert_eq!(harness.states.len(), 2);
}

#[tokio::test]
async fn sweep_removes_expired_stashes() {
    let harness = TestHarness::new(test_config());
    let session = session_with_history("nik");

    let (token, _) = harness
        .bridge
        .begin_external_redirect(&session, DeviceType::OuraRing)
        .await
        .expect("begin");

    harness.states.age_all(Duration::minutes(30));
    let removed = harness.bridge.sweep_expired().await.expect("sweep");
    assert_eq!(removed, 1);

    let result = harness.bridge.complete_external_redirect(&token).await;
    assert!(matches!(result, Err(AppError::StateNotFound)));
}
