//! Order-creation endpoint tests. The happy path needs a live payment gateway, so these cover the request-side
//! failure modes that must resolve before the gateway is ever contacted.

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use keepsake_engine::{RateLimiterApi, SealFlowApi};
use razorpay_tools::{RazorpayApi, RazorpayConfig};
use serde_json::json;

use super::{
    helpers::{post_request, server_options},
    mocks::{MockCommitBackend, MockCounterBackend},
};
use crate::routes::CreateOrderRoute;

fn register(cfg: &mut ServiceConfig, commit: MockCommitBackend, counters: MockCounterBackend) {
    let gateway = RazorpayApi::new(RazorpayConfig::default()).expect("gateway client");
    cfg.app_data(web::Data::new(SealFlowApi::new(commit)))
        .app_data(web::Data::new(RateLimiterApi::new(counters)))
        .app_data(web::Data::new(gateway))
        .app_data(web::Data::new(server_options()))
        .service(CreateOrderRoute::<MockCommitBackend, MockCounterBackend>::new());
}

fn counters_all_clear() -> MockCounterBackend {
    let mut counters = MockCounterBackend::new();
    counters.expect_increment().returning(|_, _| Ok(1));
    counters
}

fn configure_validation_only(cfg: &mut ServiceConfig) {
    // no store or gateway expectations: validation failures must resolve before any external call
    register(cfg, MockCommitBackend::new(), counters_all_clear());
}

#[actix_web::test]
async fn an_unknown_tier_is_rejected() {
    let _ = env_logger::try_init();
    let (status, body) = post_request("/order", json!({ "tier": "deluxe" }), configure_validation_only).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request.");
}

#[actix_web::test]
async fn an_ill_formed_founder_code_is_rejected() {
    let _ = env_logger::try_init();
    let (status, body) = post_request(
        "/order",
        json!({ "tier": "standard", "founderCode": "free-stuff-please" }),
        configure_validation_only,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request.");
}

#[actix_web::test]
async fn the_sixth_order_in_a_window_is_rejected() {
    let _ = env_logger::try_init();
    let (status, body) = post_request("/order", json!({ "tier": "standard" }), configure_limited).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests. Please try again later.");
}

fn configure_limited(cfg: &mut ServiceConfig) {
    let mut counters = MockCounterBackend::new();
    counters.expect_increment().returning(|_, _| Ok(6));
    register(cfg, MockCommitBackend::new(), counters);
}
