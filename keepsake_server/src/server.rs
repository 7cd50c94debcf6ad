use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use keepsake_engine::{
    kv::{CounterClient, KvStore},
    RateLimiterApi,
    SealFlowApi,
    SessionApi,
};
use razorpay_tools::RazorpayApi;

use crate::{
    config::{PaymentSecret, ServerConfig, ServerOptions},
    errors::ServerError,
    routes::{health, CreateOrderRoute, LoadSessionRoute, VerifyPaymentRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.assert_ready_for_traffic()?;
    let store = KvStore::new_with_url(&config.store_url, config.store_auth_token.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let counters = CounterClient::new_with_url(&config.counter_url, config.counter_token.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        RazorpayApi::new(config.razorpay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, store, counters, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    store: KvStore,
    counters: CounterClient,
    gateway: RazorpayApi,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let seal_api = SealFlowApi::new(store.clone());
        let session_api = SessionApi::new(store.clone());
        let limiter = RateLimiterApi::new(counters.clone());
        let options = ServerOptions::from_config(&config);
        let secret = PaymentSecret(config.razorpay.key_secret.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ks::access_log"))
            .app_data(web::Data::new(seal_api))
            .app_data(web::Data::new(session_api))
            .app_data(web::Data::new(limiter))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(secret))
            .service(health)
            .service(CreateOrderRoute::<KvStore, CounterClient>::new())
            .service(VerifyPaymentRoute::<KvStore, CounterClient>::new())
            .service(LoadSessionRoute::<KvStore, CounterClient>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
