//! Session persistence for modwatch.
//!
//! Implements the core crate's [`modwatch_core::StatePersistence`] port: a
//! versioned camelCase JSON envelope holding only durable configuration, a
//! lenient sanitize pass on load, and pluggable storage (platform data
//! directory file or in-memory).

pub mod envelope;
pub mod persistence;
pub mod sanitize;
pub mod store;

pub use envelope::{PERSIST_VERSION, PersistedEnvelope, PersistedPoint, PersistedState};
pub use persistence::PagePersistence;
pub use sanitize::{sanitize_envelope, sanitize_state};
pub use store::{ConfigError, FileStorage, MemoryStorage, StorageBackend};
