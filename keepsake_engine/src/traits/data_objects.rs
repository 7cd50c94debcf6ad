use crate::db_types::{OrderId, OrderStatus, PaymentRecord, SessionRecord};

/// An opaque version marker captured when a record is read, and required unchanged for a conditional write of the
/// same record. The pipeline never inspects the contents; any change at all means the record moved underneath us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyToken(pub String);

impl ConcurrencyToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything the atomic committer writes in one batch. The backend must apply all parts or none of them: no
/// observer may ever see a session without its ledger entry, or a verified order without its session.
#[derive(Debug, Clone)]
pub struct SealCommit {
    pub session: SessionRecord,
    pub payment: Option<PaymentRecord>,
    pub order_status: Option<(OrderId, OrderStatus)>,
}

impl SealCommit {
    /// The payment path: session + idempotency ledger entry + order status flip, as one unit.
    pub fn for_payment(session: SessionRecord, payment: PaymentRecord) -> Self {
        let order_status = Some((payment.order_id.clone(), OrderStatus::Verified));
        Self { session, payment: Some(payment), order_status }
    }

    /// The founder path: only the session itself. The code's one-shot flip happens beforehand via the conditional
    /// write, which is what decides the race.
    pub fn for_founder(session: SessionRecord) -> Self {
        Self { session, payment: None, order_status: None }
    }
}
