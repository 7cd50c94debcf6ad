use ks_common::Paise;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The request body for `POST /orders`. Amounts are always in minor units (paise).
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderRequest {
    pub amount: Paise,
    pub currency: String,
    pub receipt: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub notes: Value,
}

impl NewOrderRequest {
    pub fn new(amount: Paise, currency: &str, receipt: &str) -> Self {
        Self { amount, currency: currency.to_string(), receipt: receipt.to_string(), notes: Value::Null }
    }

    pub fn with_notes(mut self, notes: Value) -> Self {
        self.notes = notes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderApiStatus {
    Created,
    Attempted,
    Paid,
}

/// An order record as returned by the gateway. `id` is the opaque, gateway-issued order identifier that the rest of
/// the pipeline treats as the canonical order id.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: Paise,
    #[serde(default)]
    pub amount_paid: Paise,
    #[serde(default)]
    pub amount_due: Paise,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: OrderApiStatus,
    #[serde(default)]
    pub attempts: u32,
    /// Unix timestamp, as the gateway reports it.
    pub created_at: i64,
}
