use thiserror::Error;

use crate::traits::StorageError;

/// Failures of the order/verification flow. The display strings for `SignatureMismatch` and `InvalidCode` are the
/// exact generic wordings clients see; they must never hint at which sub-check failed.
#[derive(Debug, Clone, Error)]
pub enum SealFlowError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Payment verification failed.")]
    SignatureMismatch,
    #[error("Invalid or expired code.")]
    InvalidCode,
    #[error("Could not find an unoccupied session key after {0} attempts")]
    CollisionExhausted(usize),
    #[error("Storage backend error: {0}")]
    StorageError(String),
    #[error("The seal commit was rejected by the storage backend: {0}")]
    CommitFailed(String),
}

impl From<StorageError> for SealFlowError {
    fn from(e: StorageError) -> Self {
        Self::StorageError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded for {scope}")]
    LimitExceeded { scope: String },
    /// The counter store could not answer. The limiter fails closed, so this surfaces as a 503 rather than letting
    /// unmetered traffic through to the payment and redemption endpoints.
    #[error("The rate counter store is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum SessionApiError {
    #[error("Malformed session key")]
    InvalidKey,
    #[error("Session not found")]
    NotFound,
    #[error("Storage backend error: {0}")]
    StorageError(String),
}
