//! Persistence port.
//!
//! The orchestrator schedules debounced saves and restores state at
//! startup through this trait; the envelope format, sanitization, and the
//! actual backing store (file vs. in-memory fallback) live in
//! `modwatch-config`. Failures never propagate: a failed load means "no
//! persisted state" and a failed save is logged by the implementation.

use async_trait::async_trait;

use crate::model::SessionState;

#[async_trait]
pub trait StatePersistence: Send + Sync {
    /// Restore the persisted session, or `None` when nothing usable exists.
    async fn load(&self) -> Option<SessionState>;

    /// Durably save the session's topology and configuration. Volatile
    /// status is stripped by the implementation; errors are swallowed.
    async fn save(&self, state: SessionState);
}

/// No-op persistence for consumers that run purely in memory.
#[derive(Debug, Default)]
pub struct NullPersistence;

#[async_trait]
impl StatePersistence for NullPersistence {
    async fn load(&self) -> Option<SessionState> {
        None
    }

    async fn save(&self, _state: SessionState) {}
}
