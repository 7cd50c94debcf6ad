use keepsake_engine::db_types::{CardPayload, SessionKey};
use ks_common::Paise;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub tier: String,
    #[serde(default)]
    pub founder_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: Paise,
    pub currency: String,
    /// The gateway's public key id, needed by the client to open the checkout widget.
    pub key_id: String,
}

/// The two ways into `/verify`: a completed gateway payment, or a one-time founder token. Untagged so clients post
/// exactly the shape their path requires.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VerifyRequest {
    Payment(PaymentVerifyRequest),
    Founder(FounderVerifyRequest),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerifyRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub card: CardPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderVerifyRequest {
    pub founder_token: String,
    pub card: CardPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub verified: bool,
    pub session_key: SessionKey,
    pub share_slug: String,
}

impl VerifyResponse {
    pub fn sealed(session_key: SessionKey) -> Self {
        let share_slug = format!("card/{session_key}");
        Self { verified: true, session_key, share_slug }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSessionRequest {
    pub session_key: String,
}
