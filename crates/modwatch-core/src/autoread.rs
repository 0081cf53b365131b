//! Client-driven auto-read refresh.
//!
//! When server-side polling is not running on a channel, one point can be
//! silently re-read on a timer to keep its value fresh. At most one
//! auto-read target exists system-wide, and it never coexists with server
//! polling on the same channel — starting one stops the other.
//!
//! This is a pure state machine: methods return outcomes, and the
//! orchestrator owns the actual timer slot, the silent read, and the
//! operator notifications (which fire only on operator-visible transitions,
//! never per tick).

use crate::model::{AUTO_READ_MAX_INTERVAL_MS, AUTO_READ_MIN_INTERVAL_MS, Channel};

/// Clamp an auto-read interval into `[100, 60000]` ms.
pub fn normalize_auto_read_interval(interval_ms: u64) -> u64 {
    interval_ms.clamp(AUTO_READ_MIN_INTERVAL_MS, AUTO_READ_MAX_INTERVAL_MS)
}

/// Outcome of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Preconditions not met (disconnected or auto-read disabled); no-op.
    Ignored,
    /// Server polling is active on the channel; mutual exclusion blocks it.
    Blocked,
    /// Running. `same_target` marks a re-arm of the existing session, which
    /// keeps the running flag and suppresses the start notification.
    Started { interval_ms: u64, same_target: bool },
}

/// Decision for one timer firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickAction {
    /// Not running; nothing to do.
    Idle,
    /// The session guard tripped (channel gone, disconnected, identity
    /// changed, or server polling started concurrently); state was reset
    /// and the caller clears the timer.
    Stopped,
    /// Issue a silent read of this point; a failed read stops the session.
    Read { point_id: String },
}

/// Outcome of toggling `auto_read_enabled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnableOutcome {
    /// Disabled while running on this channel: session stopped.
    DisabledStopped,
    /// Disabled while idle; silent.
    DisabledIdle,
    /// Enabled; auto-read starts after the next successful manual read.
    Enabled,
}

/// Outcome of an interval change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalOutcome {
    /// Running on this channel: timer re-armed with the normalized value.
    Rearmed { interval_ms: u64 },
    /// Idle: value stored for the next session.
    Set { interval_ms: u64 },
}

/// Auto-read session state: `Idle` or `Running(channel_key, point_id)`.
#[derive(Debug, Default)]
pub struct AutoReadScheduler {
    running: bool,
    channel_key: String,
    point_id: String,
}

impl AutoReadScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when running for the given (active) channel.
    pub fn is_running_for(&self, channel: Option<&Channel>) -> bool {
        match channel {
            Some(channel) => self.running && self.channel_key == channel.key,
            None => false,
        }
    }

    /// The targeted point id, when running for the given channel.
    pub fn running_point_id(&self, channel: Option<&Channel>) -> Option<&str> {
        if self.is_running_for(channel) {
            Some(&self.point_id)
        } else {
            None
        }
    }

    /// Begin (or re-arm) auto-read of `point_id` on `channel`.
    pub fn start(&mut self, channel: &mut Channel, point_id: &str) -> StartOutcome {
        if !channel.connected || !channel.auto_read_enabled {
            return StartOutcome::Ignored;
        }
        if channel.poll_running {
            return StartOutcome::Blocked;
        }

        let same_target =
            self.running && self.channel_key == channel.key && self.point_id == point_id;

        channel.auto_read_interval_ms = normalize_auto_read_interval(channel.auto_read_interval_ms);
        self.running = true;
        self.channel_key = channel.key.clone();
        self.point_id = point_id.to_owned();

        StartOutcome::Started {
            interval_ms: channel.auto_read_interval_ms,
            same_target,
        }
    }

    /// Unconditional stop; returns whether a session was actually running
    /// (so the caller can decide whether to notify).
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        self.channel_key.clear();
        self.point_id.clear();
        was_running
    }

    /// Evaluate one timer firing against the currently active channel.
    pub fn on_tick(&mut self, active_channel: Option<&Channel>) -> TickAction {
        if !self.running {
            return TickAction::Idle;
        }

        let valid = active_channel
            .is_some_and(|c| c.connected && c.key == self.channel_key && !c.poll_running);
        if !valid {
            self.stop();
            return TickAction::Stopped;
        }

        TickAction::Read {
            point_id: self.point_id.clone(),
        }
    }

    /// A silent tick read failed: stop without operator noise.
    pub fn on_read_failed(&mut self) {
        self.stop();
    }

    /// Toggle `auto_read_enabled` on the channel.
    pub fn set_enabled(&mut self, channel: &mut Channel, enabled: bool) -> EnableOutcome {
        channel.auto_read_enabled = enabled;
        channel.auto_read_interval_ms = normalize_auto_read_interval(channel.auto_read_interval_ms);

        if !enabled {
            if self.running && self.channel_key == channel.key {
                self.stop();
                return EnableOutcome::DisabledStopped;
            }
            return EnableOutcome::DisabledIdle;
        }

        EnableOutcome::Enabled
    }

    /// Apply a new interval to the channel, re-arming a live session.
    pub fn update_interval(&mut self, channel: &mut Channel, interval_ms: u64) -> IntervalOutcome {
        channel.auto_read_interval_ms = normalize_auto_read_interval(interval_ms);

        if self.running && self.channel_key == channel.key {
            IntervalOutcome::Rearmed {
                interval_ms: channel.auto_read_interval_ms,
            }
        } else {
            IntervalOutcome::Set {
                interval_ms: channel.auto_read_interval_ms,
            }
        }
    }

    /// Stop if running against this channel (channel removal/disconnect).
    pub fn stop_for_channel(&mut self, channel_key: &str) -> bool {
        if self.running && self.channel_key == channel_key {
            self.stop()
        } else {
            false
        }
    }

    /// Stop if targeting this point (point removal).
    pub fn stop_for_point(&mut self, point_id: &str) -> bool {
        if self.running && self.point_id == point_id {
            self.stop()
        } else {
            false
        }
    }
}
