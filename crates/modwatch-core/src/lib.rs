// modwatch-core: session orchestration between modwatch-api and consumers.

pub mod alarm;
pub mod autoread;
pub mod convert;
pub mod error;
pub mod model;
pub mod notify;
pub mod page;
pub mod persist;
pub mod runtime;
pub mod timers;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use notify::{Notifier, Severity, TracingNotifier};
pub use page::{Busy, ChannelPatch, PointPatch, ReadOptions, SessionPage, SyncMode};
pub use persist::{NullPersistence, StatePersistence};
pub use runtime::{PageCommand, PageDriver};
pub use timers::{TimerSlot, Timers};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    BatchPointPayload, Channel, Gateway, PointRow, SessionState, channel_from_gateway,
    channel_key, default_gateway, default_rows, is_read_function_code, is_write_function_code,
    point_row, point_rows_by_batch,
};
