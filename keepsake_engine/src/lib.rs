//! Keepsake Payment Engine
//!
//! The engine turns a successful gateway payment, or a redeemed founder code, into exactly one durable, shareable
//! "sealed" card record. The storage backend offers only single-key strong consistency, single-key conditional
//! writes and one all-or-nothing multi-path batch write, so every transaction-like guarantee here is built at the
//! application level: HMAC signature proofs, an idempotency ledger, optimistic-concurrency conditional writes and
//! externally shared rate counters.
//!
//! The library is divided into three main sections:
//! 1. Backend contracts ([`mod@traits`]). The REST key-value store and the REST counter service are the two shared
//!    mutable resources in the whole system, and they are only ever reached through these traits. The bundled
//!    implementations live in [`mod@kv`].
//! 2. The flow APIs (`SealFlowApi`, `SessionApi`, `RateLimiterApi`). These orchestrate the pipeline steps in the
//!    order the safety argument requires: validation before any mutation, the idempotency lookup before the commit,
//!    rate checks before any expensive external call.
//! 3. Helpers ([`mod@helpers`]): the payment signature proof and the opaque key generator.

pub mod db_types;
pub mod helpers;
pub mod kv;
pub mod traits;

mod flow_api;

pub use flow_api::{
    errors::{RateLimitError, SealFlowError, SessionApiError},
    rate_limiter_api::{RateLimiterApi, RatePolicy},
    seal_flow_api::{SealFlowApi, SealOutcome},
    session_api::SessionApi,
};
