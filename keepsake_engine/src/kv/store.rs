use std::{sync::Arc, time::Duration};

use ks_common::Secret;
use log::*;
use reqwest::{header::HeaderValue, Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};

use crate::{
    db_types::{FounderCode, Order, OrderId, PaymentId, PaymentRecord, SessionKey, SessionRecord},
    traits::{CommitStore, ConcurrencyToken, SealCommit, StorageError},
};

/// The REST key-value backend.
///
/// Logical layout: `orders/{orderId}`, `payments/{paymentId}`, `shared/{sessionKey}`, `founderCodes/{code}`.
/// All of the trait's atomicity rests on two wire features: the `if-match` conditional write (single key) and the
/// root-level multi-path `PATCH`, which the backend applies as one indivisible unit and rejects as a whole on any
/// error. We do not assume partial application is impossible on the wire; we assume the *backend* guarantees it,
/// and retried-request idempotency is the actual safety net.
#[derive(Clone)]
pub struct KvStore {
    base_url: String,
    auth_token: Option<Secret<String>>,
    client: Arc<Client>,
}

impl KvStore {
    pub fn new_with_url(base_url: &str, auth_token: Option<Secret<String>>) -> Result<Self, StorageError> {
        // Every handler runs under a fixed wall-clock budget; a hung store call must fail, not stall the request.
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StorageError::Unreachable(format!("could not initialize http client. {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { base_url, auth_token, client: Arc::new(client) })
    }

    // The auth token rides in the query string, so transport errors must be stripped of their URL
    // (`Error::without_url`) before they can be logged or wrapped.
    fn url(&self, path: &str) -> String {
        match &self.auth_token {
            Some(token) => format!("{}/{path}.json?auth={}", self.base_url, token.reveal()),
            None => format!("{}/{path}.json", self.base_url),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    async fn read_error(response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_else(|e| format!("could not read error body: {e}"));
        StorageError::ResponseError { status, message }
    }

    /// Reads the value at `path`. The store returns the JSON literal `null` for an absent key, which maps onto
    /// `None` here.
    async fn get_value<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StorageError> {
        trace!("📦️ GET {path}");
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        response.json::<Option<T>>().await.map_err(|e| StorageError::JsonError(e.to_string()))
    }

    /// Reads the value at `path` together with the ETag the backend requires for a conditional write.
    async fn get_with_etag<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<(T, ConcurrencyToken)>, StorageError> {
        trace!("📦️ GET {path} (with etag)");
        let response = self
            .request(Method::GET, path)
            .header("X-Firebase-ETag", HeaderValue::from_static("true"))
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        let etag = response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .map(|s| ConcurrencyToken(s.to_string()))
            .ok_or_else(|| StorageError::JsonError("backend did not return an ETag".to_string()))?;
        let value = response.json::<Option<T>>().await.map_err(|e| StorageError::JsonError(e.to_string()))?;
        Ok(value.map(|v| (v, etag)))
    }

    async fn put_value<T: Serialize>(&self, path: &str, value: &T) -> Result<(), StorageError> {
        trace!("📦️ PUT {path}");
        let response = self
            .request(Method::PUT, path)
            .json(value)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.without_url().to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::read_error(response).await)
        }
    }

    /// A conditional write. The backend applies it only if the stored value still carries `token`'s ETag; a 412
    /// means someone else wrote first.
    async fn put_if_match<T: Serialize>(
        &self,
        path: &str,
        value: &T,
        token: &ConcurrencyToken,
    ) -> Result<(), StorageError> {
        trace!("📦️ PUT {path} (conditional)");
        let if_match = HeaderValue::from_str(token.as_str())
            .map_err(|e| StorageError::JsonError(format!("concurrency token is not a valid header value. {e}")))?;
        let response = self
            .request(Method::PUT, path)
            .header("if-match", if_match)
            .json(value)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.without_url().to_string()))?;
        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Err(StorageError::Conflict);
        }
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::read_error(response).await)
        }
    }

    /// The multi-path batch write: several absolute `path → value` pairs in one request, applied all-or-nothing by
    /// the backend.
    async fn patch_root(&self, updates: Map<String, Value>) -> Result<(), StorageError> {
        trace!("📦️ PATCH / ({} paths)", updates.len());
        let response = self
            .client
            .request(Method::PATCH, self.url(""))
            .json(&Value::Object(updates))
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.without_url().to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::read_error(response).await)
        }
    }

    fn to_json<T: Serialize>(value: &T) -> Result<Value, StorageError> {
        serde_json::to_value(value).map_err(|e| StorageError::JsonError(e.to_string()))
    }
}

impl CommitStore for KvStore {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError> {
        self.get_value(&format!("orders/{}", order_id.as_str())).await
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StorageError> {
        self.put_value(&format!("orders/{}", order.order_id.as_str()), order).await
    }

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>, StorageError> {
        self.get_value(&format!("payments/{}", payment_id.as_str())).await
    }

    async fn fetch_session(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StorageError> {
        self.get_value(&format!("shared/{}", key.as_str())).await
    }

    async fn session_exists(&self, key: &SessionKey) -> Result<bool, StorageError> {
        // shallow=true elides the payload; we only care whether the path is occupied
        let path = format!("shared/{}.json", key.as_str());
        let url = match &self.auth_token {
            Some(token) => format!("{}/{path}?shallow=true&auth={}", self.base_url, token.reveal()),
            None => format!("{}/{path}?shallow=true", self.base_url),
        };
        let response =
            self.client.get(url).send().await.map_err(|e| StorageError::Unreachable(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        let value = response.json::<Value>().await.map_err(|e| StorageError::JsonError(e.to_string()))?;
        Ok(!value.is_null())
    }

    async fn fetch_founder_code(
        &self,
        code: &str,
    ) -> Result<Option<(FounderCode, ConcurrencyToken)>, StorageError> {
        self.get_with_etag(&format!("founderCodes/{code}")).await
    }

    async fn redeem_founder_code(
        &self,
        update: &FounderCode,
        token: &ConcurrencyToken,
    ) -> Result<(), StorageError> {
        self.put_if_match(&format!("founderCodes/{}", update.code), update, token).await
    }

    async fn commit_seal(&self, commit: &SealCommit) -> Result<(), StorageError> {
        let mut updates = Map::new();
        let session_path = format!("shared/{}", commit.session.session_key.as_str());
        updates.insert(session_path, Self::to_json(&commit.session)?);
        if let Some(payment) = &commit.payment {
            updates.insert(format!("payments/{}", payment.payment_id.as_str()), Self::to_json(payment)?);
        }
        if let Some((order_id, status)) = &commit.order_status {
            updates.insert(format!("orders/{}/status", order_id.as_str()), json!(status));
        }
        debug!("📦️ Committing seal {} ({} paths)", commit.session.session_key, updates.len());
        self.patch_root(updates).await
    }
}
