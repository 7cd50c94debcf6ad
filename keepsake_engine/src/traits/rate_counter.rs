use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CounterError {
    #[error("The counter store is unreachable: {0}")]
    Unreachable(String),
    #[error("The counter store rejected the request. Error {status}. {message}")]
    ResponseError { status: u16, message: String },
    #[error("Unexpected counter store response: {0}")]
    BadResponse(String),
}

/// The shared counter service. In-process counters cannot enforce a global limit across memory-isolated handler
/// instances, so both operations go over the network to a single atomic store.
#[allow(async_fn_in_trait)]
pub trait RateCounterStore {
    /// Atomically increments `key` and returns the post-increment count. The first increment of a window applies
    /// `window` as the key's expiry; later increments leave the running window untouched.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, CounterError>;

    /// Reads the current count without incrementing. Missing keys read as zero.
    async fn current(&self, key: &str) -> Result<u64, CounterError>;
}
