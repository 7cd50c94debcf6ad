use actix_web::{http::StatusCode, web, web::ServiceConfig};
use keepsake_engine::{
    db_types::{SealOrigin, SessionRecord},
    RateLimiterApi,
    SessionApi,
};
use serde_json::json;

use super::{
    helpers::{post_request, sample_card, server_options},
    mocks::{MockCommitBackend, MockCounterBackend},
};
use crate::routes::LoadSessionRoute;

fn register(cfg: &mut ServiceConfig, commit: MockCommitBackend, counters: MockCounterBackend) {
    cfg.app_data(web::Data::new(SessionApi::new(commit)))
        .app_data(web::Data::new(RateLimiterApi::new(counters)))
        .app_data(web::Data::new(server_options()))
        .service(LoadSessionRoute::<MockCommitBackend, MockCounterBackend>::new());
}

fn counters_all_clear() -> MockCounterBackend {
    let mut counters = MockCounterBackend::new();
    counters.expect_increment().returning(|_, _| Ok(1));
    counters
}

#[actix_web::test]
async fn a_sealed_session_is_served_sanitized() {
    let _ = env_logger::try_init();
    let (status, body) = post_request("/session", json!({ "sessionKey": "abc123xy" }), configure_found).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionKey"], "abc123xy");
    assert_eq!(body["card"]["recipientName"], "Asha");
    assert!(body.get("origin").is_none(), "origin must never leave the server");
}

fn configure_found(cfg: &mut ServiceConfig) {
    let mut commit = MockCommitBackend::new();
    commit.expect_fetch_session().returning(|key| {
        Ok(Some(SessionRecord::sealed_now(
            key.clone(),
            sample_card(),
            SealOrigin::FounderCode { code: "FNDR-abc123xyz0".to_string() },
        )))
    });
    register(cfg, commit, counters_all_clear());
}

#[actix_web::test]
async fn a_malformed_key_is_rejected_without_touching_the_store() {
    let _ = env_logger::try_init();
    let (status, body) = post_request("/session", json!({ "sessionKey": "NOT A KEY" }), configure_no_store).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request.");
}

fn configure_no_store(cfg: &mut ServiceConfig) {
    // no fetch_session expectation: a malformed key must be rejected before the store is consulted
    register(cfg, MockCommitBackend::new(), counters_all_clear());
}

#[actix_web::test]
async fn an_unknown_key_is_a_404() {
    let _ = env_logger::try_init();
    let (status, body) = post_request("/session", json!({ "sessionKey": "zzzz9999" }), configure_missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found.");
}

fn configure_missing(cfg: &mut ServiceConfig) {
    let mut commit = MockCommitBackend::new();
    commit.expect_fetch_session().returning(|_| Ok(None));
    register(cfg, commit, counters_all_clear());
}

#[actix_web::test]
async fn session_loads_are_rate_limited_too() {
    let _ = env_logger::try_init();
    let (status, _) = post_request("/session", json!({ "sessionKey": "abc123xy" }), configure_limited).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

fn configure_limited(cfg: &mut ServiceConfig) {
    let mut counters = MockCounterBackend::new();
    counters.expect_increment().returning(|_, _| Ok(31));
    register(cfg, MockCommitBackend::new(), counters);
}
