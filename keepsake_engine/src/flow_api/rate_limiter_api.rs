use std::{fmt::Debug, time::Duration};

use log::*;

use crate::{flow_api::errors::RateLimitError, traits::RateCounterStore};

/// One rate-limiting rule: a counter scope, a threshold, and the window the counter lives for. Counters are keyed
/// `scope:identity`, where identity is usually the caller's IP.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub scope: &'static str,
    pub limit: u64,
    pub window: Duration,
}

impl RatePolicy {
    pub const fn new(scope: &'static str, limit: u64, window_secs: u64) -> Self {
        Self { scope, limit, window: Duration::from_secs(window_secs) }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Order creation hits the payment gateway, so it gets the tightest limit.
    pub const ORDER_CREATE: RatePolicy = RatePolicy::new("order_rate", 5, 60);
    pub const VERIFY: RatePolicy = RatePolicy::new("verify_rate", 10, 60);
    /// Failed founder-code attempts, keyed by the caller rather than the code being tried, so brute force is capped
    /// regardless of which code is targeted.
    pub const FOUNDER_FAIL: RatePolicy = RatePolicy::new("founder_fail", 5, 600);
    pub const SESSION_LOAD: RatePolicy = RatePolicy::new("session_rate", 30, 60);
}

/// Enforces [`RatePolicy`] thresholds through the shared counter store.
///
/// If the counter store itself is unreachable the limiter fails **closed**: the request is rejected rather than
/// waved through unmetered. Availability is traded for abuse resistance on the payment and code-redemption
/// endpoints this limiter guards.
pub struct RateLimiterApi<C> {
    counters: C,
}

impl<C> Debug for RateLimiterApi<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RateLimiterApi")
    }
}

impl<C> RateLimiterApi<C> {
    pub fn new(counters: C) -> Self {
        Self { counters }
    }
}

impl<C> RateLimiterApi<C>
where C: RateCounterStore
{
    /// Counts this request against the policy and rejects it if the window's threshold is now exceeded. The
    /// increment is applied even if a later pipeline step fails; an attempt was made, so it is metered.
    pub async fn check(&self, policy: RatePolicy, identity: &str) -> Result<(), RateLimitError> {
        let key = format!("{}:{identity}", policy.scope);
        let count = self.counters.increment(&key, policy.window).await.map_err(|e| {
            error!("⏱️ Counter store failure while checking {key}. Failing closed. {e}");
            RateLimitError::Unavailable(e.to_string())
        })?;
        if count > policy.limit {
            warn!("⏱️ Rate limit hit for {key}: {count} > {} in {:?}", policy.limit, policy.window);
            return Err(RateLimitError::LimitExceeded { scope: policy.scope.to_string() });
        }
        trace!("⏱️ {key} at {count}/{}", policy.limit);
        Ok(())
    }

    /// Rejects if the window's counter has already crossed the threshold, without counting this request. Used for
    /// failure-metered policies, where only failed attempts feed the counter.
    pub async fn check_without_increment(&self, policy: RatePolicy, identity: &str) -> Result<(), RateLimitError> {
        let key = format!("{}:{identity}", policy.scope);
        let count = self.counters.current(&key).await.map_err(|e| {
            error!("⏱️ Counter store failure while checking {key}. Failing closed. {e}");
            RateLimitError::Unavailable(e.to_string())
        })?;
        if count >= policy.limit {
            warn!("⏱️ {key} is over its failure budget ({count}/{})", policy.limit);
            return Err(RateLimitError::LimitExceeded { scope: policy.scope.to_string() });
        }
        Ok(())
    }

    /// Records one failed attempt against the policy's counter.
    pub async fn record_failure(&self, policy: RatePolicy, identity: &str) -> Result<u64, RateLimitError> {
        let key = format!("{}:{identity}", policy.scope);
        let count = self
            .counters
            .increment(&key, policy.window)
            .await
            .map_err(|e| RateLimitError::Unavailable(e.to_string()))?;
        debug!("⏱️ Recorded failure {count}/{} for {key}", policy.limit);
        Ok(count)
    }
}
