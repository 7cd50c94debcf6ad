//! In-memory backends implementing the engine's storage contracts, with fault injection for the failure-path tests.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use keepsake_engine::{
    db_types::{
        CardPayload,
        FounderCode,
        MediaKind,
        MediaRef,
        Order,
        OrderId,
        PaymentId,
        PaymentRecord,
        RevealRules,
        SealOrigin,
        SessionKey,
        SessionRecord,
    },
    traits::{CommitStore, ConcurrencyToken, CounterError, RateCounterStore, SealCommit, StorageError},
};

#[derive(Default)]
struct MemoryInner {
    orders: HashMap<String, Order>,
    payments: HashMap<String, PaymentRecord>,
    sessions: HashMap<String, SessionRecord>,
    // The u64 is the record version; its string form is the concurrency token.
    founder_codes: HashMap<String, (FounderCode, u64)>,
}

/// A [`CommitStore`] backed by mutex-held maps. Conditional writes compare a version counter, the batch commit
/// applies all parts under one lock, and fault flags simulate a rejecting backend, a stolen redemption race and a
/// fully occupied keyspace.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
    fail_commits: Arc<AtomicBool>,
    every_key_occupied: Arc<AtomicBool>,
    steal_next_redemption: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_founder_code(&self, code: &str) {
        let record =
            FounderCode { code: code.to_string(), redeemed: false, redeemed_at: None, session_key: None };
        self.inner.lock().unwrap().founder_codes.insert(code.to_string(), (record, 1));
    }

    /// When set, every batch commit is rejected as a whole, as a non-2xx backend response would be.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// When set, every candidate session key probes as occupied, driving the generator to exhaustion.
    pub fn occupy_every_key(&self, on: bool) {
        self.every_key_occupied.store(on, Ordering::SeqCst);
    }

    /// Makes the next conditional redemption lose its race: the store flips the code as if another handler got
    /// there first, then rejects the write with a stale token.
    pub fn steal_next_redemption(&self) {
        self.steal_next_redemption.store(true, Ordering::SeqCst);
    }

    /// Marks a key as occupied, as a concurrent committer would.
    pub fn occupy(&self, key: &SessionKey) {
        let session = SessionRecord::sealed_now(
            key.clone(),
            sample_card(),
            SealOrigin::Payment { order_id: OrderId("order_occupied".to_string()) },
        );
        self.inner.lock().unwrap().sessions.insert(key.as_str().to_string(), session);
    }

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.inner.lock().unwrap().orders.get(order_id).cloned()
    }

    pub fn founder_code(&self, code: &str) -> Option<FounderCode> {
        self.inner.lock().unwrap().founder_codes.get(code).map(|(c, _)| c.clone())
    }

    pub fn payment_count(&self) -> usize {
        self.inner.lock().unwrap().payments.len()
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }
}

impl CommitStore for MemoryStore {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError> {
        Ok(self.inner.lock().unwrap().orders.get(order_id.as_str()).cloned())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StorageError> {
        self.inner.lock().unwrap().orders.insert(order.order_id.as_str().to_string(), order.clone());
        Ok(())
    }

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>, StorageError> {
        Ok(self.inner.lock().unwrap().payments.get(payment_id.as_str()).cloned())
    }

    async fn fetch_session(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StorageError> {
        Ok(self.inner.lock().unwrap().sessions.get(key.as_str()).cloned())
    }

    async fn session_exists(&self, key: &SessionKey) -> Result<bool, StorageError> {
        if self.every_key_occupied.load(Ordering::SeqCst) {
            return Ok(true);
        }
        Ok(self.inner.lock().unwrap().sessions.contains_key(key.as_str()))
    }

    async fn fetch_founder_code(
        &self,
        code: &str,
    ) -> Result<Option<(FounderCode, ConcurrencyToken)>, StorageError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .founder_codes
            .get(code)
            .map(|(c, version)| (c.clone(), ConcurrencyToken(version.to_string()))))
    }

    async fn redeem_founder_code(
        &self,
        update: &FounderCode,
        token: &ConcurrencyToken,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner
            .founder_codes
            .get_mut(&update.code)
            .ok_or_else(|| StorageError::ResponseError { status: 404, message: "no such code".to_string() })?;
        if self.steal_next_redemption.swap(false, Ordering::SeqCst) {
            let stolen = FounderCode {
                code: update.code.clone(),
                redeemed: true,
                redeemed_at: update.redeemed_at,
                session_key: Some(SessionKey::new("winner00").unwrap()),
            };
            *entry = (stolen, entry.1 + 1);
            return Err(StorageError::Conflict);
        }
        if entry.1.to_string() != token.0 {
            return Err(StorageError::Conflict);
        }
        *entry = (update.clone(), entry.1 + 1);
        Ok(())
    }

    async fn commit_seal(&self, commit: &SealCommit) -> Result<(), StorageError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StorageError::ResponseError { status: 500, message: "injected commit failure".to_string() });
        }
        let mut inner = self.inner.lock().unwrap();
        inner
            .sessions
            .insert(commit.session.session_key.as_str().to_string(), commit.session.clone());
        if let Some(payment) = &commit.payment {
            inner.payments.insert(payment.payment_id.as_str().to_string(), payment.clone());
        }
        if let Some((order_id, status)) = &commit.order_status {
            if let Some(order) = inner.orders.get_mut(order_id.as_str()) {
                order.status = *status;
            }
        }
        Ok(())
    }
}

//--------------------------------------     MemoryCounter     -------------------------------------------------------

/// A [`RateCounterStore`] over a mutex-held map. Windows do not tick down on their own; tests expire keys
/// explicitly with [`MemoryCounter::expire`].
#[derive(Clone, Default)]
pub struct MemoryCounter {
    counts: Arc<Mutex<HashMap<String, u64>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn go_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn expire(&self, key: &str) {
        self.counts.lock().unwrap().remove(key);
    }
}

impl RateCounterStore for MemoryCounter {
    async fn increment(&self, key: &str, _window: Duration) -> Result<u64, CounterError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CounterError::Unreachable("injected outage".to_string()));
        }
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn current(&self, key: &str) -> Result<u64, CounterError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CounterError::Unreachable("injected outage".to_string()));
        }
        Ok(self.counts.lock().unwrap().get(key).copied().unwrap_or(0))
    }
}

//--------------------------------------       fixtures        -------------------------------------------------------

pub fn sample_card() -> CardPayload {
    CardPayload {
        recipient_name: "Asha".to_string(),
        letter: "Happy birthday! I hid this letter behind a paywall, as one does.".to_string(),
        media: vec![MediaRef { kind: MediaKind::Image, url: "https://cdn.example.com/cake.jpg".to_string() }],
        theme: "classic".to_string(),
        reveal: RevealRules { style: "envelope".to_string(), unlock_at: None },
    }
}
