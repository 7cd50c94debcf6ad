use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{SessionKey, SharedSession},
    flow_api::errors::SessionApiError,
    traits::CommitStore,
};

/// Read-side API for sealed sessions. Never exposes a raw [`crate::db_types::SessionRecord`]: everything leaving
/// here went through the allow-listed [`SharedSession`] projection.
pub struct SessionApi<B> {
    db: B,
}

impl<B> Debug for SessionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionApi")
    }
}

impl<B> SessionApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> SessionApi<B>
where B: CommitStore
{
    pub async fn load_shared_session(&self, key: &str) -> Result<SharedSession, SessionApiError> {
        let key = SessionKey::new(key).map_err(|_| SessionApiError::InvalidKey)?;
        let session = self
            .db
            .fetch_session(&key)
            .await
            .map_err(|e| SessionApiError::StorageError(e.to_string()))?
            .ok_or(SessionApiError::NotFound)?;
        if let Err(e) = session.card.validate() {
            // Sanitization, not validation, is the outbound security boundary; a record written under older rules
            // still gets served, but loudly.
            warn!("💻️ Stored card for session {key} fails current validation ({e}). Serving the projection anyway.");
        }
        Ok(session.to_shared())
    }
}
