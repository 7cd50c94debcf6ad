use actix_web::{http::StatusCode, web, web::ServiceConfig};
use keepsake_engine::{
    db_types::{Order, OrderId, PaymentId, PaymentRecord, SessionKey, Tier},
    helpers::PaymentSignature,
    RateLimiterApi,
    SealFlowApi,
};
use ks_common::{Paise, Secret};
use serde_json::json;

use super::{
    helpers::{post_request, sample_card, server_options},
    mocks::{MockCommitBackend, MockCounterBackend},
};
use crate::{
    config::PaymentSecret,
    routes::VerifyPaymentRoute,
};

const SECRET: &str = "s3cr3t";

fn signature_hex(order_id: &str, payment_id: &str) -> String {
    PaymentSignature::create(OrderId(order_id.to_string()), PaymentId(payment_id.to_string()), SECRET).to_hex()
}

fn register(cfg: &mut ServiceConfig, commit: MockCommitBackend, counters: MockCounterBackend) {
    cfg.app_data(web::Data::new(SealFlowApi::new(commit)))
        .app_data(web::Data::new(RateLimiterApi::new(counters)))
        .app_data(web::Data::new(server_options()))
        .app_data(web::Data::new(PaymentSecret(Secret::new(SECRET.to_string()))))
        .service(VerifyPaymentRoute::<MockCommitBackend, MockCounterBackend>::new());
}

fn counters_all_clear() -> MockCounterBackend {
    let mut counters = MockCounterBackend::new();
    counters.expect_increment().returning(|_, _| Ok(1));
    counters.expect_current().returning(|_| Ok(0));
    counters
}

#[actix_web::test]
async fn a_valid_payment_seals_a_session() {
    let _ = env_logger::try_init();
    let body = json!({
        "orderId": "order_abc",
        "paymentId": "pay_123",
        "signature": signature_hex("order_abc", "pay_123"),
        "card": sample_card(),
    });
    let (status, body) = post_request("/verify", body, configure_happy_path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
    let key = body["sessionKey"].as_str().expect("sessionKey missing");
    assert_eq!(key.len(), 8);
    assert_eq!(body["shareSlug"], format!("card/{key}"));
}

fn configure_happy_path(cfg: &mut ServiceConfig) {
    let mut commit = MockCommitBackend::new();
    commit.expect_fetch_payment().returning(|_| Ok(None));
    commit.expect_fetch_order().returning(|id| {
        Ok(Some(Order::pending(id.clone(), Paise::from(49900), "INR", Tier::Standard)))
    });
    commit.expect_session_exists().returning(|_| Ok(false));
    commit.expect_commit_seal().returning(|_| Ok(()));
    register(cfg, commit, counters_all_clear());
}

#[actix_web::test]
async fn a_tampered_signature_is_rejected_with_the_generic_wording() {
    let _ = env_logger::try_init();
    let mut sig = signature_hex("order_abc", "pay_123");
    let last = sig.pop().unwrap();
    sig.push(if last == '0' { '1' } else { '0' });
    let body = json!({
        "orderId": "order_abc",
        "paymentId": "pay_123",
        "signature": sig,
        "card": sample_card(),
    });
    let (status, body) = post_request("/verify", body, configure_no_writes).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["verified"], false);
    assert_eq!(body["error"], "Payment verification failed.");
}

#[actix_web::test]
async fn an_unparseable_signature_reads_identically_to_a_wrong_one() {
    let _ = env_logger::try_init();
    let body = json!({
        "orderId": "order_abc",
        "paymentId": "pay_123",
        "signature": "definitely not hex",
        "card": sample_card(),
    });
    let (status, body) = post_request("/verify", body, configure_no_writes).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payment verification failed.");
}

/// No store expectations beyond the ones a rejected request may legitimately touch; any write would panic the mock.
fn configure_no_writes(cfg: &mut ServiceConfig) {
    let mut commit = MockCommitBackend::new();
    commit.expect_fetch_payment().returning(|_| Ok(None));
    register(cfg, commit, counters_all_clear());
}

#[actix_web::test]
async fn a_replayed_payment_returns_the_original_session_key() {
    let _ = env_logger::try_init();
    let body = json!({
        "orderId": "order_abc",
        "paymentId": "pay_123",
        "signature": signature_hex("order_abc", "pay_123"),
        "card": sample_card(),
    });
    let (status, body) = post_request("/verify", body, configure_replay).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
    assert_eq!(body["sessionKey"], "abc123xy");
}

fn configure_replay(cfg: &mut ServiceConfig) {
    let mut commit = MockCommitBackend::new();
    commit.expect_fetch_payment().returning(|id| {
        Ok(Some(PaymentRecord {
            payment_id: id.clone(),
            order_id: OrderId("order_abc".to_string()),
            session_key: SessionKey::new("abc123xy").unwrap(),
            processed_at: chrono::Utc::now(),
        }))
    });
    // no commit_seal expectation: sealing a second session would panic the mock
    register(cfg, commit, counters_all_clear());
}

#[actix_web::test]
async fn an_unknown_founder_token_is_rejected_and_metered() {
    let _ = env_logger::try_init();
    let body = json!({ "founderToken": "FNDR-abc123xyz0", "card": sample_card() });
    let (status, body) = post_request("/verify", body, configure_unknown_founder).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["verified"], false);
    assert_eq!(body["error"], "Invalid or expired code.");
}

fn configure_unknown_founder(cfg: &mut ServiceConfig) {
    let mut commit = MockCommitBackend::new();
    commit.expect_fetch_founder_code().returning(|_| Ok(None));
    let mut counters = MockCounterBackend::new();
    // the verify-rate tick, then the failed-attempt record
    counters.expect_increment().times(2).returning(|_, _| Ok(1));
    counters.expect_current().returning(|_| Ok(0));
    register(cfg, commit, counters);
}

#[actix_web::test]
async fn a_caller_over_the_failure_budget_is_cut_off_before_any_lookup() {
    let _ = env_logger::try_init();
    let body = json!({ "founderToken": "FNDR-abc123xyz0", "card": sample_card() });
    let (status, body) = post_request("/verify", body, configure_spent_budget).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests. Please try again later.");
}

fn configure_spent_budget(cfg: &mut ServiceConfig) {
    // no fetch_founder_code expectation: the cut-off must happen before the store is touched
    let commit = MockCommitBackend::new();
    let mut counters = MockCounterBackend::new();
    counters.expect_increment().returning(|_, _| Ok(1));
    counters.expect_current().returning(|_| Ok(5));
    register(cfg, commit, counters);
}

#[actix_web::test]
async fn the_eleventh_verification_in_a_window_is_rejected() {
    let _ = env_logger::try_init();
    let body = json!({
        "orderId": "order_abc",
        "paymentId": "pay_123",
        "signature": signature_hex("order_abc", "pay_123"),
        "card": sample_card(),
    });
    let (status, body) = post_request("/verify", body, configure_rate_limited).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests. Please try again later.");
}

fn configure_rate_limited(cfg: &mut ServiceConfig) {
    let commit = MockCommitBackend::new();
    let mut counters = MockCounterBackend::new();
    counters.expect_increment().returning(|_, _| Ok(11));
    register(cfg, commit, counters);
}

#[actix_web::test]
async fn a_counter_outage_fails_closed() {
    let _ = env_logger::try_init();
    let body = json!({
        "orderId": "order_abc",
        "paymentId": "pay_123",
        "signature": signature_hex("order_abc", "pay_123"),
        "card": sample_card(),
    });
    let (status, body) = post_request("/verify", body, configure_counter_outage).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service temporarily unavailable. Please try again later.");
}

fn configure_counter_outage(cfg: &mut ServiceConfig) {
    let commit = MockCommitBackend::new();
    let mut counters = MockCounterBackend::new();
    counters
        .expect_increment()
        .returning(|_, _| Err(keepsake_engine::traits::CounterError::Unreachable("down".to_string())));
    register(cfg, commit, counters);
}
