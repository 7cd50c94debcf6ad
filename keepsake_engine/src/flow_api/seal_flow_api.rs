use std::fmt::Debug;

use chrono::Utc;
use ks_common::Secret;
use log::*;

use crate::{
    db_types::{
        is_valid_founder_code,
        CardPayload,
        FounderCode,
        Order,
        OrderId,
        OrderStatus,
        PaymentRecord,
        SealOrigin,
        SessionKey,
        SessionRecord,
    },
    flow_api::errors::SealFlowError,
    helpers::{new_session_key_candidate, PaymentSignature, MAX_KEY_ATTEMPTS},
    traits::{CommitStore, SealCommit, StorageError},
};

/// The outcome of a successful verification or redemption. `replayed` is true when the idempotency ledger detected
/// a duplicate delivery and the original session key was returned instead of sealing a second session.
#[derive(Debug, Clone)]
pub struct SealOutcome {
    pub session_key: SessionKey,
    pub replayed: bool,
}

/// `SealFlowApi` is the primary API for turning a verified payment, or a redeemed founder code, into exactly one
/// sealed session.
///
/// Both entry points converge on [`CommitStore::commit_seal`], and both preserve the ordering the safety argument
/// needs: proof checks strictly precede any mutation, the idempotency lookup strictly precedes the commit, and key
/// resolution probes the store rather than trusting randomness alone.
pub struct SealFlowApi<B> {
    db: B,
}

impl<B> Debug for SealFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SealFlowApi")
    }
}

impl<B> SealFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> SealFlowApi<B>
where B: CommitStore
{
    /// Stores the pending order created against the payment gateway. The record is the anchor the later
    /// verification step flips to `verified` inside the atomic commit.
    pub async fn insert_pending_order(&self, order: Order) -> Result<Order, SealFlowError> {
        self.db.insert_order(&order).await?;
        debug!("💌️ Pending order {} stored ({} {})", order.order_id, order.amount, order.tier);
        Ok(order)
    }

    /// Fetches a gateway order, for operator inspection.
    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, SealFlowError> {
        Ok(self.db.fetch_order(order_id).await?)
    }

    /// The payment verification path.
    ///
    /// Steps, in the order the guarantees require: signature proof, idempotency ledger lookup (a hit replays the
    /// original outcome and touches nothing), payload validation, order lookup, key resolution, atomic commit.
    /// Every failure before the commit leaves the store untouched, and a failed commit applies nothing, so the
    /// whole request is safe for the client to retry.
    pub async fn verify_and_seal(
        &self,
        signature: PaymentSignature,
        card: CardPayload,
        secret: &Secret<String>,
    ) -> Result<SealOutcome, SealFlowError> {
        if !signature.is_valid(secret.reveal()) {
            warn!("💌️ Signature check failed for order {}", signature.order_id);
            return Err(SealFlowError::SignatureMismatch);
        }
        if let Some(prior) = self.db.fetch_payment(&signature.payment_id).await? {
            info!("💌️ Payment {} was already processed. Replaying the original result.", signature.payment_id);
            return Ok(SealOutcome { session_key: prior.session_key, replayed: true });
        }
        card.validate().map_err(|e| SealFlowError::Validation(e.to_string()))?;
        let order = self.db.fetch_order(&signature.order_id).await?.ok_or_else(|| {
            // A valid signature over an order we never created. Report the same generic failure as a bad
            // signature; the response must not reveal which check tripped.
            warn!("💌️ Verification presented for unknown order {}", signature.order_id);
            SealFlowError::SignatureMismatch
        })?;
        if order.status == OrderStatus::Verified {
            // The order is sealed under a different payment id, otherwise the ledger lookup would have hit.
            warn!("💌️ Order {} is already verified but payment {} has no ledger entry", order.order_id, signature.payment_id);
            return Err(SealFlowError::SignatureMismatch);
        }
        let session_key = self.resolve_session_key().await?;
        let session = SessionRecord::sealed_now(
            session_key.clone(),
            card,
            SealOrigin::Payment { order_id: order.order_id.clone() },
        );
        let payment = PaymentRecord {
            payment_id: signature.payment_id.clone(),
            order_id: order.order_id.clone(),
            session_key: session_key.clone(),
            processed_at: Utc::now(),
        };
        let commit = SealCommit::for_payment(session, payment);
        self.db.commit_seal(&commit).await.map_err(|e| {
            error!("💌️ Seal commit for order {} was rejected; nothing was applied. {e}", order.order_id);
            SealFlowError::CommitFailed(e.to_string())
        })?;
        info!("💌️ Order {} sealed as session {session_key}", order.order_id);
        Ok(SealOutcome { session_key, replayed: false })
    }

    /// The founder-token redemption path.
    ///
    /// The one-shot `redeemed` flip is a conditional write keyed on the token captured at read time; exactly one of
    /// any number of concurrent redeemers wins it. On a lost race we re-read to confirm a genuine prior redemption
    /// before reporting the generic failure. Bounded retry is reserved for transient I/O; a decided race is never
    /// retried.
    pub async fn redeem_founder_token(&self, token: &str, card: CardPayload) -> Result<SealOutcome, SealFlowError> {
        if !is_valid_founder_code(token) {
            debug!("🎫️ Presented founder token is not even well-formed");
            return Err(SealFlowError::InvalidCode);
        }
        card.validate().map_err(|e| SealFlowError::Validation(e.to_string()))?;
        let (code, ctoken) = self.db.fetch_founder_code(token).await?.ok_or_else(|| {
            info!("🎫️ Unknown founder code presented");
            SealFlowError::InvalidCode
        })?;
        if code.redeemed {
            return self.resume_or_reject(code, card).await;
        }
        let session_key = self.resolve_session_key().await?;
        let update = code.redeemed_now(session_key.clone());
        match self.db.redeem_founder_code(&update, &ctoken).await {
            Ok(()) => {},
            Err(StorageError::Conflict) => {
                info!("🎫️ Lost the redemption race for {}", update.code);
                return match self.db.fetch_founder_code(token).await? {
                    Some((code, _)) if code.redeemed => Err(SealFlowError::InvalidCode),
                    // The record moved but is still unredeemed (a minting-tool touch, perhaps). The race was not
                    // decided against us, but this attempt is spent; the client may retry.
                    _ => Err(SealFlowError::InvalidCode),
                };
            },
            Err(StorageError::Unreachable(e)) => {
                warn!("🎫️ Transient storage error during redemption, retrying once. {e}");
                let (fresh, fresh_token) =
                    self.db.fetch_founder_code(token).await?.ok_or(SealFlowError::InvalidCode)?;
                if fresh.redeemed {
                    return self.resume_or_reject(fresh, card).await;
                }
                let update = fresh.redeemed_now(session_key.clone());
                self.db.redeem_founder_code(&update, &fresh_token).await.map_err(|e| match e {
                    StorageError::Conflict => SealFlowError::InvalidCode,
                    e => SealFlowError::from(e),
                })?;
            },
            Err(e) => return Err(e.into()),
        }
        self.seal_founder_session(update.code, session_key, card).await
    }

    /// Handles a code that reads as redeemed: either it genuinely was (reject), or a previous attempt won the
    /// conditional write and then failed its commit. In the latter case the session key reserved by the winning
    /// write lets us finish that commit idempotently.
    async fn resume_or_reject(&self, code: FounderCode, card: CardPayload) -> Result<SealOutcome, SealFlowError> {
        let key = match code.session_key.clone() {
            Some(key) => key,
            None => return Err(SealFlowError::InvalidCode),
        };
        if self.db.session_exists(&key).await? {
            info!("🎫️ Code {} was already redeemed", code.code);
            return Err(SealFlowError::InvalidCode);
        }
        warn!("🎫️ Code {} was consumed but its seal never landed. Completing the commit.", code.code);
        self.seal_founder_session(code.code, key, card).await
    }

    async fn seal_founder_session(
        &self,
        code: String,
        session_key: SessionKey,
        card: CardPayload,
    ) -> Result<SealOutcome, SealFlowError> {
        let session = SessionRecord::sealed_now(session_key.clone(), card, SealOrigin::FounderCode { code });
        let commit = SealCommit::for_founder(session);
        self.db.commit_seal(&commit).await.map_err(|e| {
            error!("🎫️ Seal commit for session {session_key} was rejected; nothing was applied. {e}");
            SealFlowError::CommitFailed(e.to_string())
        })?;
        info!("🎫️ Founder redemption sealed session {session_key}");
        Ok(SealOutcome { session_key, replayed: false })
    }

    /// Resolves a collision-free session key: generate a candidate, probe the path it would occupy, re-roll
    /// uniformly while occupied. Exhausting the attempt budget is a hard failure, never a silent duplicate.
    pub async fn resolve_session_key(&self) -> Result<SessionKey, SealFlowError> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let candidate = new_session_key_candidate();
            if !self.db.session_exists(&candidate).await? {
                trace!("🗝️ Session key resolved after {attempt} attempt(s)");
                return Ok(candidate);
            }
            debug!("🗝️ Session key collision on attempt {attempt}, re-rolling");
        }
        error!(
            "🗝️ No unoccupied session key after {MAX_KEY_ATTEMPTS} attempts. At 36^8 keys this should be \
             practically impossible; check the session-exists probe."
        );
        Err(SealFlowError::CollisionExhausted(MAX_KEY_ATTEMPTS))
    }
}
