use std::{sync::Arc, time::Duration};

use ks_common::Secret;
use log::*;
use reqwest::Client;
use serde_json::{json, Value};

use crate::traits::{CounterError, RateCounterStore};

/// The shared counter service client.
///
/// Speaks the Upstash Redis REST convention: a bearer-authenticated `POST /pipeline` carrying commands as JSON
/// arrays. An increment is pipelined with `EXPIRE <key> <secs> NX`, so the first increment of a window starts the
/// window's clock and later increments leave it alone. Both commands execute on the same atomic store, which is
/// what lets memory-isolated handler instances share one limit.
#[derive(Clone)]
pub struct CounterClient {
    url: String,
    token: Secret<String>,
    client: Arc<Client>,
}

impl CounterClient {
    pub fn new_with_url(url: &str, token: Secret<String>) -> Result<Self, CounterError> {
        // A slow counter is an outage: the limiter fails closed either way, so cut it off quickly.
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| CounterError::Unreachable(format!("could not initialize http client. {e}")))?;
        Ok(Self { url: url.trim_end_matches('/').to_string(), token, client: Arc::new(client) })
    }

    async fn pipeline(&self, commands: Value) -> Result<Vec<Value>, CounterError> {
        let response = self
            .client
            .post(format!("{}/pipeline", self.url))
            .bearer_auth(self.token.reveal())
            .json(&commands)
            .send()
            .await
            .map_err(|e| CounterError::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|e| format!("could not read error body: {e}"));
            return Err(CounterError::ResponseError { status, message });
        }
        response.json::<Vec<Value>>().await.map_err(|e| CounterError::BadResponse(e.to_string()))
    }

    /// The counter service reports integers as numbers and GET results as strings; accept either.
    fn parse_count(value: &Value) -> Result<u64, CounterError> {
        let result = &value["result"];
        if result.is_null() {
            return Ok(0);
        }
        result
            .as_u64()
            .or_else(|| result.as_str().and_then(|s| s.parse::<u64>().ok()))
            .ok_or_else(|| CounterError::BadResponse(format!("unexpected count value: {result}")))
    }
}

impl RateCounterStore for CounterClient {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, CounterError> {
        let secs = window.as_secs();
        let commands = json!([["INCR", key], ["EXPIRE", key, secs, "NX"]]);
        let results = self.pipeline(commands).await?;
        let count = results
            .first()
            .ok_or_else(|| CounterError::BadResponse("empty pipeline response".to_string()))
            .and_then(Self::parse_count)?;
        trace!("⏱️ {key} incremented to {count}");
        Ok(count)
    }

    async fn current(&self, key: &str) -> Result<u64, CounterError> {
        let results = self.pipeline(json!([["GET", key]])).await?;
        results
            .first()
            .ok_or_else(|| CounterError::BadResponse("empty pipeline response".to_string()))
            .and_then(Self::parse_count)
    }
}
