use std::env;

use keepsake_engine::RatePolicy;
use ks_common::{parse_boolean_flag, Paise, Secret};
use log::*;
use razorpay_tools::RazorpayConfig;

use crate::errors::ServerError;

const DEFAULT_KS_HOST: &str = "127.0.0.1";
const DEFAULT_KS_PORT: u16 = 8360;
const DEFAULT_PRICE_STANDARD: i64 = 49900;
const DEFAULT_PRICE_REPLY: i64 = 79900;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the REST key-value store that holds orders, payments, sessions and founder codes.
    pub store_url: String,
    pub store_auth_token: Option<Secret<String>>,
    /// Base URL and bearer token for the shared rate-counter service.
    pub counter_url: String,
    pub counter_token: Secret<String>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    pub pricing: PricingConfig,
    pub limits: RateLimits,
    /// Payment gateway configuration. The gateway's key secret doubles as the HMAC key for verification
    /// signatures, which is how the gateway defines its checkout contract.
    pub razorpay: RazorpayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_KS_HOST.to_string(),
            port: DEFAULT_KS_PORT,
            store_url: String::default(),
            store_auth_token: None,
            counter_url: String::default(),
            counter_token: Secret::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            pricing: PricingConfig::default(),
            limits: RateLimits::default(),
            razorpay: RazorpayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("KS_HOST").ok().unwrap_or_else(|| DEFAULT_KS_HOST.into());
        let port = env::var("KS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for KS_PORT. {e} Using the default, {DEFAULT_KS_PORT}, instead.");
                    DEFAULT_KS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_KS_PORT);
        let store_url = env::var("KS_STORE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ KS_STORE_URL is not set. Please set it to the base URL of the key-value store.");
            String::default()
        });
        let store_auth_token = env::var("KS_STORE_AUTH_TOKEN").ok().map(Secret::new);
        let counter_url = env::var("KS_COUNTER_URL").ok().unwrap_or_else(|| {
            error!("🪛️ KS_COUNTER_URL is not set. Please set it to the base URL of the rate counter service.");
            String::default()
        });
        let counter_token = Secret::new(env::var("KS_COUNTER_TOKEN").ok().unwrap_or_else(|| {
            error!("🪛️ KS_COUNTER_TOKEN is not set. Please set it to the counter service bearer token.");
            String::default()
        }));
        let use_x_forwarded_for = parse_boolean_flag(env::var("KS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("KS_USE_FORWARDED").ok(), false);
        let pricing = PricingConfig::from_env_or_default();
        let limits = RateLimits::from_env_or_default();
        let razorpay = RazorpayConfig::new_from_env_or_default();
        Self {
            host,
            port,
            store_url,
            store_auth_token,
            counter_url,
            counter_token,
            use_x_forwarded_for,
            use_forwarded,
            pricing,
            limits,
            razorpay,
        }
    }

    /// Fail-fast configuration check, run once before the server binds. The pipeline must never discover a missing
    /// secret or URL halfway through a request.
    pub fn assert_ready_for_traffic(&self) -> Result<(), ServerError> {
        if self.store_url.is_empty() {
            return Err(ServerError::ConfigurationError("KS_STORE_URL is not set".to_string()));
        }
        if self.counter_url.is_empty() {
            return Err(ServerError::ConfigurationError("KS_COUNTER_URL is not set".to_string()));
        }
        if self.counter_token.reveal().is_empty() {
            return Err(ServerError::ConfigurationError("KS_COUNTER_TOKEN is not set".to_string()));
        }
        if self.razorpay.key_id.is_empty() || self.razorpay.key_secret.reveal().is_empty() {
            return Err(ServerError::ConfigurationError("Payment gateway credentials are not set".to_string()));
        }
        Ok(())
    }
}

//-------------------------------------------------  PricingConfig  ---------------------------------------------------
#[derive(Clone, Copy, Debug)]
pub struct PricingConfig {
    pub standard: Paise,
    pub reply: Paise,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { standard: Paise::from(DEFAULT_PRICE_STANDARD), reply: Paise::from(DEFAULT_PRICE_REPLY) }
    }
}

impl PricingConfig {
    pub fn from_env_or_default() -> Self {
        let standard = price_from_env("KS_PRICE_STANDARD", DEFAULT_PRICE_STANDARD);
        let reply = price_from_env("KS_PRICE_REPLY", DEFAULT_PRICE_REPLY);
        Self { standard, reply }
    }
}

fn price_from_env(var: &str, default: i64) -> Paise {
    env::var(var)
        .ok()
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid price in {var}: {e}. Using the default, {default} paise."))
                .ok()
        })
        .map(Paise::from)
        .unwrap_or_else(|| Paise::from(default))
}

//-------------------------------------------------  RateLimits  ------------------------------------------------------
/// The per-route rate policies, env-overridable. Windows are fixed; only the thresholds are tunable, which has been
/// enough in practice.
#[derive(Clone, Copy, Debug)]
pub struct RateLimits {
    pub order: RatePolicy,
    pub verify: RatePolicy,
    pub founder_fail: RatePolicy,
    pub session: RatePolicy,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            order: RatePolicy::ORDER_CREATE,
            verify: RatePolicy::VERIFY,
            founder_fail: RatePolicy::FOUNDER_FAIL,
            session: RatePolicy::SESSION_LOAD,
        }
    }
}

impl RateLimits {
    pub fn from_env_or_default() -> Self {
        Self {
            order: RatePolicy::ORDER_CREATE.with_limit(limit_from_env("KS_RATE_LIMIT_ORDER", RatePolicy::ORDER_CREATE.limit)),
            verify: RatePolicy::VERIFY.with_limit(limit_from_env("KS_RATE_LIMIT_VERIFY", RatePolicy::VERIFY.limit)),
            founder_fail: RatePolicy::FOUNDER_FAIL
                .with_limit(limit_from_env("KS_RATE_LIMIT_FOUNDER_FAIL", RatePolicy::FOUNDER_FAIL.limit)),
            session: RatePolicy::SESSION_LOAD
                .with_limit(limit_from_env("KS_RATE_LIMIT_SESSION", RatePolicy::SESSION_LOAD.limit)),
        }
    }
}

fn limit_from_env(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|s| {
            s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid limit in {var}: {e}. Using the default, {default}.")).ok()
        })
        .unwrap_or(default)
}

//-------------------------------------------------  ServerOptions  ---------------------------------------------------
/// A subset of the server configuration that handlers need on every request. Generally we try to keep this as small
/// as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub pricing: PricingConfig,
    pub limits: RateLimits,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            pricing: config.pricing,
            limits: config.limits,
        }
    }
}

/// The HMAC key verification signatures are checked against. A dedicated wrapper so that it can be injected as its
/// own `web::Data` without colliding with other secrets.
#[derive(Clone, Debug, Default)]
pub struct PaymentSecret(pub Secret<String>);
