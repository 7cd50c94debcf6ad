//! # Payment verification signature
//!
//! After a checkout completes, the gateway hands the client a signature proving that *this* payment id settled
//! *this* order id. The client posts both ids and the signature back to us, and we recompute the proof with the
//! shared secret. Without this check, anyone could claim an arbitrary `(order_id, payment_id)` pair and mint
//! themselves a sealed card.
//!
//! ## Message format
//!
//! The signed message is the canonical string
//!
//! ```text
//!     {order_id}|{payment_id}
//! ```
//!
//! and the signature is `HMAC-SHA256(message, key = shared secret)`, transmitted as lowercase hex.
//!
//! Comparison uses the `hmac` crate's `verify_slice`, which is constant time; an early-exit byte comparison would
//! leak how much of a guessed signature was correct. Neither the secret nor a full signature is ever logged, and
//! callers must collapse every failure mode into one generic "verification failed" message so the response gives no
//! oracle about *which* part was wrong.

use hmac::{Hmac, Mac};
use log::trace;
use sha2::Sha256;
use thiserror::Error;

use crate::db_types::{OrderId, PaymentId};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error)]
#[error("Invalid payment signature: {0}")]
pub struct PaymentSignatureError(String);

impl From<String> for PaymentSignatureError {
    fn from(e: String) -> Self {
        Self(e)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentSignature {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    signature: Vec<u8>,
}

impl PaymentSignature {
    /// Parses a client-supplied hex signature. Only the format is checked here; validity against the secret is a
    /// separate, explicit step.
    pub fn new(order_id: OrderId, payment_id: PaymentId, signature_hex: &str) -> Result<Self, PaymentSignatureError> {
        let signature = hex::decode(signature_hex.trim())
            .map_err(|e| PaymentSignatureError(format!("signature is not valid hex. {e}")))?;
        if signature.len() != 32 {
            return Err(PaymentSignatureError(format!(
                "signature must be 32 bytes, not {}",
                signature.len()
            )));
        }
        Ok(Self { order_id, payment_id, signature })
    }

    /// Computes the signature for a message. Used by the test suites and operator tooling; the server only ever
    /// verifies.
    pub fn create(order_id: OrderId, payment_id: PaymentId, secret: &str) -> Self {
        let message = signature_message(&order_id, &payment_id);
        let signature = sign_message(&message, secret);
        Self { order_id, payment_id, signature }
    }

    pub fn message(&self) -> String {
        signature_message(&self.order_id, &self.payment_id)
    }

    /// Constant-time verification against the shared secret.
    pub fn is_valid(&self, secret: &str) -> bool {
        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(self.message().as_bytes());
        let valid = mac.verify_slice(&self.signature).is_ok();
        trace!("🔐️ Signature check for order {}: {}", self.order_id, if valid { "✅️" } else { "❌️" });
        valid
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.signature)
    }
}

pub fn signature_message(order_id: &OrderId, payment_id: &PaymentId) -> String {
    format!("{}|{}", order_id.as_str(), payment_id.as_str())
}

pub fn sign_message(message: &str, secret: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(message.as_bytes());
    mac.finalize().into_bytes().to_vec()
}
