//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (I/O, the
//! gateway and storage calls, etc.) must be expressed as futures or asynchronous functions so that worker threads
//! keep serving other requests while the call is in flight. Every handler in this module awaits at least one
//! external call, and none of them hold any state across requests; the pipeline's cross-request coordination lives
//! entirely behind the engine's storage traits.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use keepsake_engine::{
    db_types::{is_valid_founder_code, Order, OrderId, PaymentId, Tier},
    helpers::PaymentSignature,
    traits::{CommitStore, RateCounterStore},
    RateLimiterApi,
    SealFlowApi,
    SealFlowError,
    SessionApi,
};
use ks_common::INR_CURRENCY_CODE;
use log::*;
use razorpay_tools::{new_receipt_id, NewOrderRequest, RazorpayApi};
use serde_json::json;

use crate::{
    config::{PaymentSecret, ServerOptions},
    data_objects::{CreateOrderRequest, CreateOrderResponse, LoadSessionRequest, VerifyRequest, VerifyResponse},
    errors::ServerError,
    helpers::rate_limit_identity,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Order creation  ---------------------------------------------------
route!(create_order => Post "/order" impl CommitStore, RateCounterStore);
/// Route handler for the order-creation endpoint.
///
/// Pipeline order matters here: the rate check runs before anything expensive, the tier and code format checks run
/// before the gateway call, and the only mutations are the rate-counter tick (which stands even if a later step
/// fails; an attempt was made) and the pending-order insert after the gateway accepted the order.
pub async fn create_order<BStore, CCounters>(
    req: HttpRequest,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<SealFlowApi<BStore>>,
    limiter: web::Data<RateLimiterApi<CCounters>>,
    gateway: web::Data<RazorpayApi>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    BStore: CommitStore,
    CCounters: RateCounterStore,
{
    trace!("💻️ Received create-order request");
    let identity = rate_limit_identity(&req, options.use_x_forwarded_for, options.use_forwarded);
    limiter.check(options.limits.order, &identity).await?;
    let params = body.into_inner();
    let tier = params.tier.parse::<Tier>().map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    if let Some(code) = &params.founder_code {
        if !is_valid_founder_code(code) {
            debug!("💻️ Order request carried an ill-formed founder code");
            return Err(ServerError::InvalidRequestBody("invalid founder code format".to_string()));
        }
    }
    let amount = match tier {
        Tier::Standard => options.pricing.standard,
        Tier::Reply => options.pricing.reply,
    };
    let request = NewOrderRequest::new(amount, INR_CURRENCY_CODE, &new_receipt_id())
        .with_notes(json!({ "tier": tier.to_string() }));
    let gw_order = gateway.create_order(request).await.map_err(|e| {
        warn!("💻️ Gateway rejected order creation. {e}");
        ServerError::GatewayError(e.to_string())
    })?;
    let mut order = Order::pending(OrderId(gw_order.id.clone()), gw_order.amount, &gw_order.currency, tier);
    if let Some(code) = &params.founder_code {
        order = order.with_founder_code(code);
    }
    let order = api.insert_pending_order(order).await?;
    info!("💻️ Order {} created for tier {tier}", order.order_id);
    let response = CreateOrderResponse {
        order_id: order.order_id.as_str().to_string(),
        amount: order.amount,
        currency: order.currency.clone(),
        key_id: gateway.key_id().to_string(),
    };
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Verification  -----------------------------------------------------
route!(verify_payment => Post "/verify" impl CommitStore, RateCounterStore);
/// Route handler for the verify-and-seal endpoint.
///
/// Two independent paths converge on the same atomic committer: a gateway payment proven by its HMAC signature, or
/// a one-time founder token consumed through the optimistic redemption guard. Failed founder attempts feed a
/// dedicated per-caller counter so that code brute-force is capped regardless of which code is being guessed.
/// Replays of an already-processed payment return the original success payload.
pub async fn verify_payment<BStore, CCounters>(
    req: HttpRequest,
    body: web::Json<VerifyRequest>,
    api: web::Data<SealFlowApi<BStore>>,
    limiter: web::Data<RateLimiterApi<CCounters>>,
    options: web::Data<ServerOptions>,
    secret: web::Data<PaymentSecret>,
) -> Result<HttpResponse, ServerError>
where
    BStore: CommitStore,
    CCounters: RateCounterStore,
{
    trace!("💻️ Received verify request");
    let identity = rate_limit_identity(&req, options.use_x_forwarded_for, options.use_forwarded);
    limiter.check(options.limits.verify, &identity).await?;
    let outcome = match body.into_inner() {
        VerifyRequest::Payment(p) => {
            let signature = PaymentSignature::new(OrderId(p.order_id), PaymentId(p.payment_id), &p.signature)
                .map_err(|e| {
                    // An unparseable signature gets the same generic rejection as a wrong one
                    debug!("💻️ Ill-formed verification signature. {e}");
                    ServerError::PaymentVerificationFailed
                })?;
            api.verify_and_seal(signature, p.card, &secret.0).await?
        },
        VerifyRequest::Founder(f) => {
            limiter.check_without_increment(options.limits.founder_fail, &identity).await?;
            match api.redeem_founder_token(&f.founder_token, f.card).await {
                Ok(outcome) => outcome,
                Err(e @ SealFlowError::InvalidCode) => {
                    if let Err(rec) = limiter.record_failure(options.limits.founder_fail, &identity).await {
                        warn!("💻️ Could not record the failed code attempt. {rec}");
                    }
                    return Err(e.into());
                },
                Err(e) => return Err(e.into()),
            }
        },
    };
    if outcome.replayed {
        info!("💻️ Duplicate verification answered from the idempotency ledger");
    }
    Ok(HttpResponse::Ok().json(VerifyResponse::sealed(outcome.session_key)))
}

//----------------------------------------------   Session load  -----------------------------------------------------
route!(load_session => Post "/session" impl CommitStore, RateCounterStore);
/// Route handler for the sealed-session load proxy. Returns the sanitized projection only.
pub async fn load_session<BStore, CCounters>(
    req: HttpRequest,
    body: web::Json<LoadSessionRequest>,
    api: web::Data<SessionApi<BStore>>,
    limiter: web::Data<RateLimiterApi<CCounters>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    BStore: CommitStore,
    CCounters: RateCounterStore,
{
    trace!("💻️ Received session load request");
    let identity = rate_limit_identity(&req, options.use_x_forwarded_for, options.use_forwarded);
    limiter.check(options.limits.session, &identity).await?;
    let shared = api.load_shared_session(&body.session_key).await?;
    debug!("💻️ Served session {}", shared.session_key);
    Ok(HttpResponse::Ok().json(shared))
}
