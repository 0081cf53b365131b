//! [`StatePersistence`] implementation over a [`StorageBackend`].
//!
//! Failures never reach the orchestrator: an unreadable or unusable document
//! loads as `None`, and a failed save is logged and dropped — the session
//! keeps running on in-memory state either way.

use async_trait::async_trait;
use modwatch_core::{SessionState, StatePersistence};
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::PersistedEnvelope;
use crate::sanitize;
use crate::store::StorageBackend;

pub struct PagePersistence<B> {
    backend: B,
}

impl<B: StorageBackend> PagePersistence<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: StorageBackend> StatePersistence for PagePersistence<B> {
    async fn load(&self) -> Option<SessionState> {
        let raw = match self.backend.read().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("failed to read persisted session: {err}");
                return None;
            }
        };
        let document: Value = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(err) => {
                warn!("persisted session is not valid JSON, ignoring: {err}");
                return None;
            }
        };
        let state = sanitize::sanitize_envelope(&document);
        if state.is_none() {
            warn!("persisted session has an unknown shape, ignoring");
        }
        state
    }

    async fn save(&self, state: SessionState) {
        let envelope = PersistedEnvelope::from_session(&state);
        let json = match serde_json::to_string_pretty(&envelope) {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to serialize session state: {err}");
                return;
            }
        };
        match self.backend.write(&json).await {
            Ok(()) => debug!(bytes = json.len(), "session state persisted"),
            Err(err) => warn!("failed to persist session state: {err}"),
        }
    }
}
