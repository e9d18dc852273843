//! Integration tests for the enter → start → resolve flow.

use std::collections::BTreeMap;
use std::sync::Arc;

use racer_protocol::{StartRequest, query_signature};
use racer_session::{SessionConfig, SessionError, SessionManager, VkVerifier};
use racer_store::{CatalogSeed, StaticCatalog, Store};
use racer_timer::ManualClock;

const SECRET: &str = "integration-secret";

fn manager(store: Arc<Store>, clock: Arc<ManualClock>) -> SessionManager {
    SessionManager::new(
        store,
        Arc::new(StaticCatalog::from_seed(CatalogSeed::builtin()).unwrap()),
        Arc::new(VkVerifier::new(SECRET)),
        clock,
        SessionConfig::default(),
    )
}

fn launch(viewer_id: &str) -> BTreeMap<String, String> {
    let verifier = VkVerifier::new(SECRET);
    let mut params = BTreeMap::from([
        ("api_id".to_string(), "7".to_string()),
        ("viewer_id".to_string(), viewer_id.to_string()),
        ("auth_key".to_string(), verifier.auth_key("7", viewer_id)),
    ]);
    let sig = query_signature(&params, SECRET);
    params.insert("sig".to_string(), sig);
    params
}

fn start(viewer_id: &str) -> StartRequest {
    StartRequest {
        platform: "vk.com".into(),
        platform_id: viewer_id.into(),
        platform_api_id: "7".into(),
        platform_auth_key: VkVerifier::new(SECRET).auth_key("7", viewer_id),
    }
}

#[tokio::test]
async fn test_enter_then_start_issues_working_token() {
    let store = Arc::new(Store::new());
    let clock = Arc::new(ManualClock::new(10_000));
    let mgr = manager(store.clone(), clock.clone());

    let entered = mgr.enter(&launch("31")).await.unwrap();
    clock.advance(750);
    let started = mgr.start(&start("31")).await.unwrap();

    assert!(entered.created);
    assert_eq!(started.player_id, entered.player_id);
    let session = mgr.resolve(&started.token).await.unwrap();
    assert_eq!(session.player_id, entered.player_id);
    assert_eq!(session.secret, "750");
}

#[tokio::test]
async fn test_second_start_reuses_token_and_moves_secret() {
    let store = Arc::new(Store::new());
    let clock = Arc::new(ManualClock::new(10_000));
    let mgr = manager(store, clock.clone());
    mgr.enter(&launch("31")).await.unwrap();

    let first = mgr.start(&start("31")).await.unwrap();
    clock.advance(1_000);
    let second = mgr.start(&start("31")).await.unwrap();

    assert_eq!(first.token, second.token);
    assert_eq!(mgr.resolve(&second.token).await.unwrap().secret, "1000");
}

#[tokio::test]
async fn test_reentry_refreshes_login_without_new_player() {
    let store = Arc::new(Store::new());
    let clock = Arc::new(ManualClock::new(10_000));
    let mgr = manager(store.clone(), clock.clone());

    let first = mgr.enter(&launch("31")).await.unwrap();
    clock.advance(5_000);
    let second = mgr.enter(&launch("31")).await.unwrap();

    assert!(!second.created);
    assert_eq!(first.player_id, second.player_id);
    assert_eq!(second.login_ms, 15_000);
    assert_eq!(store.player_count().await, 1);
}

#[tokio::test]
async fn test_forged_launch_never_touches_store() {
    let store = Arc::new(Store::new());
    let mgr = manager(store.clone(), Arc::new(ManualClock::new(0)));
    let mut params = launch("31");
    params.insert("viewer_id".into(), "32".into());

    let result = mgr.enter(&params).await;

    assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    assert_eq!(store.player_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_entries_create_one_player() {
    let store = Arc::new(Store::new());
    let mgr = manager(store.clone(), Arc::new(ManualClock::new(0)));
    let params = launch("31");

    let (a, b) = tokio::join!(mgr.enter(&params), mgr.enter(&params));

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.player_id, b.player_id);
    assert!(a.created ^ b.created);
    assert_eq!(store.player_count().await, 1);
}
