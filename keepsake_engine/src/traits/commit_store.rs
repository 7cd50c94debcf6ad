use thiserror::Error;

use crate::{
    db_types::{FounderCode, Order, OrderId, PaymentId, PaymentRecord, SessionKey, SessionRecord},
    traits::{ConcurrencyToken, SealCommit},
};

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("The conditional write was rejected; the concurrency token is stale")]
    Conflict,
    #[error("The storage backend is unreachable: {0}")]
    Unreachable(String),
    #[error("The storage backend rejected the request. Error {status}. {message}")]
    ResponseError { status: u16, message: String },
    #[error("Could not (de)serialize a stored record: {0}")]
    JsonError(String),
}

/// The contract the key-value backend must honour for the pipeline's safety argument to hold.
///
/// Reads are strongly consistent per key. [`Self::commit_seal`] is all-or-nothing: a non-success response means none
/// of the batch was applied, which is what makes a failed verification request safe to retry from scratch.
/// [`Self::redeem_founder_code`] succeeds only if the stored record still matches the token captured by
/// [`Self::fetch_founder_code`], which is what makes concurrent redemption lose exactly one of the two races.
#[allow(async_fn_in_trait)]
pub trait CommitStore {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError>;

    /// Stores a freshly created pending order. Plain single-key write; orders are keyed by the gateway-issued id,
    /// which the gateway guarantees unique.
    async fn insert_order(&self, order: &Order) -> Result<(), StorageError>;

    /// The idempotency ledger lookup. A `Some` here means the payment was fully processed before, and the attached
    /// session key is the one and only session for it.
    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>, StorageError>;

    async fn fetch_session(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StorageError>;

    /// Probes the storage path a candidate key would occupy. Used by the key generator's collision loop.
    async fn session_exists(&self, key: &SessionKey) -> Result<bool, StorageError>;

    /// Reads a founder code together with the opaque concurrency token required for a later conditional write.
    async fn fetch_founder_code(
        &self,
        code: &str,
    ) -> Result<Option<(FounderCode, ConcurrencyToken)>, StorageError>;

    /// Conditionally replaces the founder code record. Fails with [`StorageError::Conflict`] if the stored record no
    /// longer matches `token`, i.e. somebody else won the race.
    async fn redeem_founder_code(
        &self,
        update: &FounderCode,
        token: &ConcurrencyToken,
    ) -> Result<(), StorageError>;

    /// Applies the whole commit as a single all-or-nothing batch write.
    async fn commit_seal(&self, commit: &SealCommit) -> Result<(), StorageError>;
}
