//! Explicit timer slots owned by the orchestrator.
//!
//! Each timer kind has exactly one slot; arming always replaces the previous
//! schedule, so no two live instances of the same kind can exist. The slots
//! hold only the desired schedule — the driver owns the actual `tokio`
//! intervals and resynchronizes them whenever a slot's generation changes.

use std::time::Duration;

/// One timer kind's desired schedule.
#[derive(Debug, Default)]
pub struct TimerSlot {
    period: Option<Duration>,
    generation: u64,
}

impl TimerSlot {
    /// Schedule (or reschedule) the timer. Clears the previous instance.
    pub fn arm(&mut self, period: Duration) {
        self.period = Some(period);
        self.generation += 1;
    }

    /// Cancel the timer.
    pub fn clear(&mut self) {
        if self.period.take().is_some() {
            self.generation += 1;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.period.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Bumped on every arm/clear; the driver rebuilds its interval when the
    /// observed generation differs.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The orchestrator's four process-wide timers.
#[derive(Debug, Default)]
pub struct Timers {
    /// 1 s snapshot sync, live only while a channel is polling.
    pub snapshot: TimerSlot,
    /// Auto-read interval, live only while auto-read runs.
    pub auto_read: TimerSlot,
    /// Telemetry collection, bounded below by 100 ms.
    pub collect: TimerSlot,
    /// 300 ms debounce before a persistence write (one-shot).
    pub persist: TimerSlot,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel everything (shutdown, full teardown).
    pub fn clear_all(&mut self) {
        self.snapshot.clear();
        self.auto_read.clear();
        self.collect.clear();
        self.persist.clear();
    }
}
