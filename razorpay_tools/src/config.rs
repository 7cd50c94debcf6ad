use ks_common::Secret;
use log::*;

pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone, Default)]
pub struct RazorpayConfig {
    /// The public key id. This is not a secret; it is returned to clients so that the checkout widget can be opened.
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub api_url: String,
}

impl RazorpayConfig {
    pub fn new_from_env_or_default() -> Self {
        let key_id = std::env::var("KS_RAZORPAY_KEY_ID").unwrap_or_else(|_| {
            warn!("💳️ KS_RAZORPAY_KEY_ID not set, using (probably useless) default");
            "rzp_test_0000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("KS_RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("💳️ KS_RAZORPAY_KEY_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let api_url = std::env::var("KS_RAZORPAY_API_URL").unwrap_or_else(|_| {
            info!("💳️ KS_RAZORPAY_API_URL not set, using {DEFAULT_RAZORPAY_API_URL}");
            DEFAULT_RAZORPAY_API_URL.to_string()
        });
        Self { key_id, key_secret, api_url }
    }
}
