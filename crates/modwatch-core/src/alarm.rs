//! Poll-timeout alarm escalation.
//!
//! Classifies backend polling errors as timeout-like vs. other and escalates
//! to a hard alarm once the error budget
//! `poll_read_timeout_ms × poll_read_retry_count` is exhausted. Pure
//! decision functions: they mutate the borrowed channel in place and return
//! an outcome; timers and notifications stay with the orchestrator.

use crate::model::{
    Channel, POLL_READ_RETRY_MAX, POLL_READ_RETRY_MIN, POLL_READ_TIMEOUT_MAX_MS,
    POLL_READ_TIMEOUT_MIN_MS,
};

const READ_TIMEOUT_TAG: &str = "modbus read timeout";
const CHANNEL_NOT_FOUND_TAG: &str = "channel not found";
const TIMEOUT_TAG: &str = "timeout";
// Executor deployments localized for Chinese sites emit this marker.
const TIMEOUT_ZH_TAG: &str = "超时";

/// Result of routing one polling error through the escalator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollErrorOutcome {
    /// Not timeout-like: counter and alarm flag were reset.
    Reset,
    /// Timeout-like, but still inside the error budget.
    BelowThreshold,
    /// Budget exhausted: the channel was forced down. `notify` is true only
    /// on the transition edge — the alarm text is shown exactly once.
    Escalated { notify: bool },
}

/// Clamp the per-channel timeout/retry config into the supported ranges.
pub fn normalize_poll_timeout_config(channel: &mut Channel) {
    channel.poll_read_timeout_ms = channel
        .poll_read_timeout_ms
        .clamp(POLL_READ_TIMEOUT_MIN_MS, POLL_READ_TIMEOUT_MAX_MS);
    channel.poll_read_retry_count = channel
        .poll_read_retry_count
        .clamp(POLL_READ_RETRY_MIN, POLL_READ_RETRY_MAX);
}

/// Reset escalation state: on success, on an unrelated error, and on every
/// fresh poll start or reconnect.
pub fn reset_poll_timeout_state(channel: &mut Channel) {
    channel.poll_read_timeout_hit_count = 0;
    channel.poll_read_alarm = false;
}

/// Substring heuristic for the escalating error class. Isolated here so the
/// matching rules can be revisited without touching the escalation math.
pub fn is_timeout_like_error(message: &str) -> bool {
    let normalized = message.to_lowercase();
    normalized.contains(READ_TIMEOUT_TAG)
        || normalized.contains(CHANNEL_NOT_FOUND_TAG)
        || normalized.contains(TIMEOUT_TAG)
        || message.contains(TIMEOUT_ZH_TAG)
}

fn alarm_text(channel: &Channel) -> String {
    let threshold = channel.poll_read_timeout_ms * u64::from(channel.poll_read_retry_count);
    format!(
        "Poll read alarm: timeout {}ms x {} retries = {}ms",
        channel.poll_read_timeout_ms, channel.poll_read_retry_count, threshold
    )
}

/// Route one backend polling error through the escalator.
///
/// Timeout-like errors accumulate toward the budget; anything else resets
/// it (unrelated errors are assumed self-recovering). Escalation forces the
/// channel to a disconnected, non-polling state — session-fatal, the
/// operator must reconnect explicitly. The caller clears the snapshot timer
/// when `Escalated` is returned.
pub fn handle_polling_error(channel: &mut Channel, message: &str) -> PollErrorOutcome {
    normalize_poll_timeout_config(channel);

    if !is_timeout_like_error(message) {
        reset_poll_timeout_state(channel);
        return PollErrorOutcome::Reset;
    }

    channel.poll_read_timeout_hit_count += 1;

    let threshold = channel.poll_read_timeout_ms * u64::from(channel.poll_read_retry_count);
    let elapsed_by_rule =
        channel.poll_read_timeout_ms * u64::from(channel.poll_read_timeout_hit_count);

    if elapsed_by_rule < threshold {
        channel.poll_read_alarm = false;
        return PollErrorOutcome::BelowThreshold;
    }

    let notify = !channel.poll_read_alarm;
    channel.poll_read_alarm = true;
    channel.poll_running = false;
    channel.connected = false;
    channel.endpoint.clear();
    channel.polling_row_id.clear();

    PollErrorOutcome::Escalated { notify }
}

/// The alarm text shown while the alarm flag is set, else empty. Pure
/// function of the channel's config/alarm state; display only.
pub fn poll_alarm_message(channel: &Channel) -> String {
    if !channel.poll_read_alarm {
        return String::new();
    }
    alarm_text(channel)
}

/// Text for the escalation notification (same math as the alarm message).
pub fn escalation_message(channel: &Channel) -> String {
    alarm_text(channel)
}
