//! Record types for the payment-to-seal pipeline.
//!
//! Everything stored in the key-value backend is defined here, along with the format validation that has to happen
//! before a record is allowed anywhere near a commit. The card payload carries user-supplied content, so it gets an
//! explicit schema that is enforced at write time, and a sanitized, allow-listed projection ([`SharedSession`]) that
//! is the only shape ever returned to a reader.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use ks_common::Paise;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sealed session keys are exactly 8 lowercase alphanumeric characters.
pub const SESSION_KEY_LEN: usize = 8;
/// Founder codes are `FNDR-` plus a 10 character lowercase alphanumeric suffix. The suffix keyspace (36^10) keeps
/// brute-force economically infeasible against the per-IP failed-attempt limiter.
pub const FOUNDER_CODE_PREFIX: &str = "FNDR-";
pub const FOUNDER_SUFFIX_LEN: usize = 10;

pub const THEMES: [&str; 5] = ["classic", "midnight", "sunrise", "garden", "parchment"];
pub const REVEAL_STYLES: [&str; 3] = ["instant", "envelope", "countdown"];

pub const MAX_LETTER_LEN: usize = 20_000;
pub const MAX_RECIPIENT_LEN: usize = 120;
pub const MAX_MEDIA_ITEMS: usize = 12;
pub const MAX_MEDIA_URL_LEN: usize = 2_048;

#[derive(Debug, Clone, Error)]
#[error("Invalid record format: {0}")]
pub struct RecordFormatError(pub String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The gateway-issued order identifier. Opaque to this pipeline; we never parse or derive anything from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       PaymentId       -------------------------------------------------------
/// The gateway-issued payment identifier. Globally unique on the gateway side; the existence of a
/// [`PaymentRecord`] under this id is the idempotency proof for the whole verification operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

impl FromStr for PaymentId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for PaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl PaymentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      SessionKey       -------------------------------------------------------
/// An opaque, unguessable 8-character key identifying a sealed card. Keys carry no structure and are never derived
/// from user input, so they cannot be enumerated or predicted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new<S: Into<String>>(key: S) -> Result<Self, RecordFormatError> {
        let key = key.into();
        if is_valid_session_key(&key) {
            Ok(Self(key))
        } else {
            Err(RecordFormatError(format!("'{key}' is not a valid session key")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionKey {
    type Err = RecordFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = RecordFormatError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

impl Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn is_valid_session_key(s: &str) -> bool {
    let re = Regex::new(r"^[a-z0-9]{8}$").unwrap();
    re.is_match(s)
}

pub fn is_valid_founder_code(s: &str) -> bool {
    let re = Regex::new(r"^FNDR-[a-z0-9]{10}$").unwrap();
    re.is_match(s)
}

//--------------------------------------         Tier          -------------------------------------------------------
/// The product tier purchased with the order. `Reply` unlocks the recipient's reply flow in the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Standard,
    Reply,
}

impl FromStr for Tier {
    type Err = RecordFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "reply" => Ok(Self::Reply),
            s => Err(RecordFormatError(format!("Invalid tier: {s}"))),
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Standard => write!(f, "standard"),
            Tier::Reply => write!(f, "reply"),
        }
    }
}

//--------------------------------------      OrderStatus      -------------------------------------------------------
/// Order state. The only transition this pipeline ever performs is `Pending` → `Verified`, exactly once, inside the
/// atomic seal commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Verified,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Verified => write!(f, "verified"),
        }
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// The order id as assigned by the payment gateway
    pub order_id: OrderId,
    /// The total price of the order, in paise
    pub amount: Paise,
    pub currency: String,
    pub tier: Tier,
    /// A founder code supplied at order creation. Recorded for bookkeeping only; consumption happens on the
    /// founder-token verification path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder_code_applied: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// A freshly created, unpaid order.
    pub fn pending(order_id: OrderId, amount: Paise, currency: &str, tier: Tier) -> Self {
        Self {
            order_id,
            amount,
            currency: currency.to_string(),
            tier,
            founder_code_applied: None,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn with_founder_code(mut self, code: &str) -> Self {
        self.founder_code_applied = Some(code.to_string());
        self
    }
}

//--------------------------------------     PaymentRecord     -------------------------------------------------------
/// The idempotency ledger entry. Created exactly once per payment id, inside the same atomic batch as the session
/// it points at, and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub session_key: SessionKey,
    pub processed_at: DateTime<Utc>,
}

//--------------------------------------      CardPayload      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealRules {
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_at: Option<DateTime<Utc>>,
}

/// The full card content as sealed into a session. This is user-supplied data, so [`CardPayload::validate`] runs
/// before every commit and again when a stored record is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPayload {
    pub recipient_name: String,
    pub letter: String,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    pub theme: String,
    pub reveal: RevealRules,
}

impl CardPayload {
    pub fn validate(&self) -> Result<(), RecordFormatError> {
        if self.recipient_name.trim().is_empty() || self.recipient_name.len() > MAX_RECIPIENT_LEN {
            return Err(RecordFormatError("recipient name is missing or too long".into()));
        }
        if self.letter.trim().is_empty() || self.letter.len() > MAX_LETTER_LEN {
            return Err(RecordFormatError("letter is missing or too long".into()));
        }
        if self.media.len() > MAX_MEDIA_ITEMS {
            return Err(RecordFormatError(format!("at most {MAX_MEDIA_ITEMS} media items are allowed")));
        }
        for m in &self.media {
            if m.url.len() > MAX_MEDIA_URL_LEN || !(m.url.starts_with("https://") || m.url.starts_with("http://")) {
                return Err(RecordFormatError("media url is not a valid http(s) url".into()));
            }
        }
        if !THEMES.contains(&self.theme.as_str()) {
            return Err(RecordFormatError(format!("unknown theme: {}", self.theme)));
        }
        if !REVEAL_STYLES.contains(&self.reveal.style.as_str()) {
            return Err(RecordFormatError(format!("unknown reveal style: {}", self.reveal.style)));
        }
        Ok(())
    }
}

//--------------------------------------     SessionRecord     -------------------------------------------------------
/// How a session came to exist. Not exposed to readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum SealOrigin {
    Payment { order_id: OrderId },
    FounderCode { code: String },
}

/// The durable "sealed" card record. Written exactly once by the atomic committer; read-many, write-never afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_key: SessionKey,
    pub card: CardPayload,
    pub sealed_at: DateTime<Utc>,
    pub origin: SealOrigin,
}

impl SessionRecord {
    pub fn sealed_now(session_key: SessionKey, card: CardPayload, origin: SealOrigin) -> Self {
        Self { session_key, card, sealed_at: Utc::now(), origin }
    }

    /// The outward-facing projection. Only allow-listed fields leave the server; in particular the origin (order and
    /// payment ids, founder code) never does.
    pub fn to_shared(&self) -> SharedSession {
        SharedSession { session_key: self.session_key.clone(), card: self.card.clone(), sealed_at: self.sealed_at }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSession {
    pub session_key: SessionKey,
    pub card: CardPayload,
    pub sealed_at: DateTime<Utc>,
}

//--------------------------------------      FounderCode      -------------------------------------------------------
/// A single-use promotional code. Minted out of band; the only mutation this pipeline performs is the one-shot
/// `redeemed: false` → `true` flip via a conditional write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderCode {
    pub code: String,
    pub redeemed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    /// The session the winning redemption sealed. Recorded so that a crashed commit can be completed on retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<SessionKey>,
}

impl FounderCode {
    pub fn redeemed_now(&self, session_key: SessionKey) -> Self {
        Self {
            code: self.code.clone(),
            redeemed: true,
            redeemed_at: Some(Utc::now()),
            session_key: Some(session_key),
        }
    }
}
