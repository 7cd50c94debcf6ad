use std::time::Duration;

use keepsake_engine::{
    db_types::{FounderCode, Order, OrderId, PaymentId, PaymentRecord, SessionKey, SessionRecord},
    traits::{CommitStore, ConcurrencyToken, CounterError, RateCounterStore, SealCommit, StorageError},
};
use mockall::mock;

mock! {
    pub CommitBackend {}
    impl CommitStore for CommitBackend {
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError>;
        async fn insert_order(&self, order: &Order) -> Result<(), StorageError>;
        async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>, StorageError>;
        async fn fetch_session(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StorageError>;
        async fn session_exists(&self, key: &SessionKey) -> Result<bool, StorageError>;
        async fn fetch_founder_code(&self, code: &str) -> Result<Option<(FounderCode, ConcurrencyToken)>, StorageError>;
        async fn redeem_founder_code(&self, update: &FounderCode, token: &ConcurrencyToken) -> Result<(), StorageError>;
        async fn commit_seal(&self, commit: &SealCommit) -> Result<(), StorageError>;
    }
}

mock! {
    pub CounterBackend {}
    impl RateCounterStore for CounterBackend {
        async fn increment(&self, key: &str, window: Duration) -> Result<u64, CounterError>;
        async fn current(&self, key: &str) -> Result<u64, CounterError>;
    }
}
