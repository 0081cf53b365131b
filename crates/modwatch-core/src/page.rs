//! The session page orchestrator.
//!
//! [`SessionPage`] is the single writer of the session model. Every operator
//! action and every timer tick funnels through its `&mut self` methods, so no
//! two operations ever interleave mid-flight. Timer schedules live in
//! [`Timers`]; the driver in [`crate::runtime`] turns them into real `tokio`
//! intervals and feeds the ticks back here.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use modwatch_api::types::{
    CollectPointsRequest, ConfigLoadRequest, ConfigSaveRequest, ConnectRequest, PollStartRequest,
    ReadPointRequest, TelemetryIngestRequest, TelemetrySample, WritePointRequest,
};
use modwatch_api::ModbusExecutor;
use tracing::{debug, warn};

use crate::alarm::{self, PollErrorOutcome};
use crate::autoread::{AutoReadScheduler, EnableOutcome, IntervalOutcome, StartOutcome, TickAction};
use crate::convert;
use crate::error::CoreError;
use crate::model::{
    self, BatchPointPayload, SessionState, SLAVE_ID_MAX, SLAVE_ID_MIN,
};
use crate::notify::{Notifier, Severity};
use crate::persist::StatePersistence;
use crate::timers::Timers;

const PERSIST_DEBOUNCE: Duration = Duration::from_millis(300);
const SNAPSHOT_PERIOD: Duration = Duration::from_secs(1);
const COLLECT_MIN_PERIOD_MS: u64 = 100;

/// Where durable configuration lives: the executor's database (`Online`) or
/// only the local session file (`Offline`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Online,
    Offline,
}

impl SyncMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// In-flight flags for the UI; `row_id` marks the point row a single-shot
/// read/write is working on.
#[derive(Debug, Clone, Default)]
pub struct Busy {
    pub connect: bool,
    pub disconnect: bool,
    pub snapshot: bool,
    pub sync: bool,
    pub collect: bool,
    pub row_id: String,
}

/// Noise control for a single-shot read.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub silent_success: bool,
    pub silent_error: bool,
    pub show_busy: bool,
}

impl ReadOptions {
    /// Fully silent read used by auto-read ticks and telemetry collection.
    pub fn silent() -> Self {
        Self {
            silent_success: true,
            silent_error: true,
            show_busy: false,
        }
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            silent_success: false,
            silent_error: false,
            show_busy: true,
        }
    }
}

/// Partial update for a point row's editable fields.
#[derive(Debug, Clone, Default)]
pub struct PointPatch {
    pub name: Option<String>,
    pub function_code: Option<u8>,
    pub address: Option<u32>,
    pub quantity: Option<u16>,
    pub instruction: Option<String>,
}

/// Partial update for the active channel's editable settings.
#[derive(Debug, Clone, Default)]
pub struct ChannelPatch {
    pub label: Option<String>,
    pub station_code: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub poll_interval_ms: Option<u64>,
    pub poll_read_timeout_ms: Option<u64>,
    pub poll_read_retry_count: Option<u32>,
}

pub struct SessionPage {
    state: SessionState,
    scheduler: AutoReadScheduler,
    timers: Timers,
    busy: Busy,
    sync_mode: SyncMode,
    selected_point_ids: Vec<String>,
    collecting_point_ids: Vec<String>,
    restoring: bool,
    executor: Arc<dyn ModbusExecutor>,
    persistence: Arc<dyn StatePersistence>,
    notifier: Arc<dyn Notifier>,
}

impl SessionPage {
    pub fn new(
        executor: Arc<dyn ModbusExecutor>,
        persistence: Arc<dyn StatePersistence>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: SessionState::new(),
            scheduler: AutoReadScheduler::new(),
            timers: Timers::new(),
            busy: Busy::default(),
            sync_mode: SyncMode::Offline,
            selected_point_ids: Vec::new(),
            collecting_point_ids: Vec::new(),
            // Suppresses debounced saves until the restore pass finishes.
            restoring: true,
            executor,
            persistence,
            notifier,
        }
    }

    // ── Views ───────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn busy(&self) -> &Busy {
        &self.busy
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn is_auto_read_running(&self) -> bool {
        self.scheduler.is_running_for(self.state.active_channel())
    }

    pub fn auto_read_point_id(&self) -> Option<&str> {
        self.scheduler.running_point_id(self.state.active_channel())
    }

    /// Alarm banner text for the active channel, empty when no alarm is set.
    pub fn poll_alarm_message(&self) -> String {
        self.state
            .active_channel()
            .map(alarm::poll_alarm_message)
            .unwrap_or_default()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Replace the in-memory session with the persisted one, if any. Saves
    /// stay suppressed until this has run once.
    pub async fn restore_persisted_state(&mut self) {
        if let Some(persisted) = self.persistence.load().await {
            debug!(
                channels = persisted.channels.len(),
                "restored persisted session"
            );
            self.state = persisted;
        }
        self.restoring = false;
        self.ensure_collect_timer();
    }

    /// Immediate save; called when the debounce timer fires and on shutdown.
    pub async fn flush_persist(&mut self) {
        self.timers.persist.clear();
        self.persistence.save(self.state.clone()).await;
    }

    /// Cancel all timers, drop the auto-read session, and save once more.
    pub async fn shutdown(&mut self) {
        self.timers.clear_all();
        self.scheduler.stop();
        self.persistence.save(self.state.clone()).await;
    }

    fn schedule_persist(&mut self) {
        if self.restoring {
            return;
        }
        self.timers.persist.arm(PERSIST_DEBOUNCE);
    }

    /// Post-mutation hook: re-evaluate the collect schedule and debounce a
    /// save. Any operation that touches durable state ends here.
    fn on_state_changed(&mut self) {
        self.ensure_collect_timer();
        self.schedule_persist();
    }

    fn ensure_collect_timer(&mut self) {
        self.timers.collect.clear();
        let Some(channel) = self.state.active_channel() else {
            return;
        };
        if !channel.connected || self.collecting_point_ids.is_empty() {
            return;
        }
        let period_ms = channel.auto_read_interval_ms.max(COLLECT_MIN_PERIOD_MS);
        self.timers.collect.arm(Duration::from_millis(period_ms));
    }

    fn warn(&self, err: &CoreError) {
        self.notifier.notify(Severity::Warning, &err.to_string());
    }

    fn report(&self, err: modwatch_api::Error) {
        self.notifier
            .notify(Severity::Error, &CoreError::from(err).to_string());
    }

    fn active_key_or_warn(&self) -> Option<String> {
        match self.state.active_channel() {
            Some(channel) => Some(channel.key.clone()),
            None => {
                self.warn(&CoreError::NoActiveChannel);
                None
            }
        }
    }

    /// Active channel key, provided it is connected.
    fn connected_key_or_warn(&self) -> Option<String> {
        let channel = self.state.active_channel()?;
        if !channel.connected {
            self.warn(&CoreError::NotConnected);
            return None;
        }
        Some(channel.key.clone())
    }

    fn stop_auto_read_silent(&mut self) {
        self.scheduler.stop();
        self.timers.auto_read.clear();
    }

    // ── Connection ──────────────────────────────────────────────────

    pub async fn connect_channel(&mut self) {
        let Some(key) = self.active_key_or_warn() else {
            return;
        };
        let Some((host, port, slave_id)) = self
            .state
            .channel(&key)
            .map(|c| (c.host.clone(), c.port, c.slave_id))
        else {
            return;
        };

        self.busy.connect = true;
        let result = self
            .executor
            .connect(ConnectRequest {
                channel_key: key.clone(),
                host,
                port,
                slave_id,
            })
            .await;
        self.busy.connect = false;

        match result {
            Ok(data) => {
                if let Some(channel) = self.state.channel_mut(&key) {
                    channel.connected = true;
                    channel.endpoint = data.endpoint.clone();
                    channel.poll_interval_ms = data.poll_interval_ms;
                    channel.last_error.clear();
                    alarm::reset_poll_timeout_state(channel);
                }
                self.notifier.notify(
                    Severity::Success,
                    &format!("Channel connected: {}", data.endpoint),
                );
                self.sync_snapshot().await;
                self.on_state_changed();
            }
            Err(err) => {
                if let Some(channel) = self.state.channel_mut(&key) {
                    channel.connected = false;
                    channel.endpoint.clear();
                }
                self.report(err);
            }
        }
    }

    /// Disconnect the active channel. Local teardown is unconditional: even
    /// when the remote call fails, the session is not reusable and all local
    /// resources referencing it are released.
    pub async fn disconnect_channel(&mut self) {
        let Some(key) = self.active_key_or_warn() else {
            return;
        };

        self.busy.disconnect = true;
        let result = self.executor.disconnect(&key).await;
        self.busy.disconnect = false;

        self.stop_auto_read_silent();
        self.timers.snapshot.clear();
        self.timers.collect.clear();
        if let Some(channel) = self.state.channel_mut(&key) {
            channel.connected = false;
            channel.poll_running = false;
            channel.polling_row_id.clear();
            channel.endpoint.clear();
            channel.last_error.clear();
            alarm::reset_poll_timeout_state(channel);
        }

        match result {
            Ok(_) => self
                .notifier
                .notify(Severity::Success, "Channel disconnected"),
            Err(err) => self.report(err),
        }
    }

    pub async fn update_poll_interval(&mut self) {
        let Some(key) = self.connected_key_or_warn() else {
            return;
        };
        let Some(interval_ms) = self.state.channel(&key).map(|c| c.poll_interval_ms) else {
            return;
        };

        match self.executor.set_poll_interval(&key, interval_ms).await {
            Ok(data) => {
                if let Some(channel) = self.state.channel_mut(&key) {
                    channel.poll_interval_ms = data.interval_ms;
                }
                self.notifier.notify(
                    Severity::Success,
                    &format!("Poll interval updated to {} ms", data.interval_ms),
                );
                self.on_state_changed();
            }
            Err(err) => self.report(err),
        }
    }

    // ── Poll-timeout alarm ──────────────────────────────────────────

    /// Clamp and apply the active channel's timeout/retry settings.
    pub fn apply_poll_timeout_config(&mut self) {
        let Some(key) = self.active_key_or_warn() else {
            return;
        };
        if let Some(channel) = self.state.channel_mut(&key) {
            alarm::normalize_poll_timeout_config(channel);
            let message = format!(
                "Poll timeout policy applied: {}ms x {} retries",
                channel.poll_read_timeout_ms, channel.poll_read_retry_count
            );
            self.notifier.notify(Severity::Success, &message);
        }
        self.on_state_changed();
    }

    fn route_polling_error(&mut self, key: &str, message: &str) {
        let Some(channel) = self.state.channel_mut(key) else {
            return;
        };
        let outcome = alarm::handle_polling_error(channel, message);
        let alarm_text = alarm::escalation_message(channel);

        if let PollErrorOutcome::Escalated { notify } = outcome {
            self.timers.snapshot.clear();
            if notify {
                self.notifier.notify(Severity::Error, &alarm_text);
            }
        }
    }

    // ── Auto-read ───────────────────────────────────────────────────

    pub fn set_auto_read_enabled(&mut self, enabled: bool) {
        let Some(key) = self.active_key_or_warn() else {
            return;
        };
        let Some(channel) = self.state.channel_mut(&key) else {
            return;
        };
        match self.scheduler.set_enabled(channel, enabled) {
            EnableOutcome::DisabledStopped => {
                self.timers.auto_read.clear();
                self.notifier
                    .notify(Severity::Info, "Auto-read refresh stopped");
            }
            EnableOutcome::DisabledIdle => {}
            EnableOutcome::Enabled => self.notifier.notify(
                Severity::Info,
                "Auto-read refresh enabled; starts after a successful manual read",
            ),
        }
        self.on_state_changed();
    }

    pub fn update_auto_read_interval(&mut self, interval_ms: u64) {
        let Some(key) = self.active_key_or_warn() else {
            return;
        };
        let Some(channel) = self.state.channel_mut(&key) else {
            return;
        };
        match self.scheduler.update_interval(channel, interval_ms) {
            IntervalOutcome::Rearmed { interval_ms } => {
                self.timers
                    .auto_read
                    .arm(Duration::from_millis(interval_ms));
                self.notifier.notify(
                    Severity::Success,
                    &format!("Auto-read interval updated to {interval_ms} ms"),
                );
            }
            IntervalOutcome::Set { interval_ms } => self.notifier.notify(
                Severity::Success,
                &format!("Auto-read interval set to {interval_ms} ms"),
            ),
        }
        self.on_state_changed();
    }

    /// Operator-requested stop; notifies only if a session was running.
    pub fn stop_auto_read(&mut self) {
        let was_running = self.scheduler.stop();
        self.timers.auto_read.clear();
        if was_running {
            self.notifier
                .notify(Severity::Info, "Auto-read refresh stopped");
        }
    }

    /// Chain auto-read onto a point after a successful manual read.
    fn start_auto_read(&mut self, point_id: &str) {
        let Some(key) = self.state.active_channel().map(|c| c.key.clone()) else {
            return;
        };
        let Some(channel) = self.state.channel_mut(&key) else {
            return;
        };
        match self.scheduler.start(channel, point_id) {
            StartOutcome::Ignored => {}
            StartOutcome::Blocked => self.notifier.notify(
                Severity::Warning,
                "Backend polling is running; auto-read refresh unavailable",
            ),
            StartOutcome::Started {
                interval_ms,
                same_target,
            } => {
                self.timers
                    .auto_read
                    .arm(Duration::from_millis(interval_ms));
                if !same_target {
                    self.notifier.notify(
                        Severity::Success,
                        &format!("Auto-read refresh started: {interval_ms} ms"),
                    );
                }
            }
        }
    }

    /// One auto-read timer firing.
    pub async fn tick_auto_read(&mut self) {
        let action = self.scheduler.on_tick(self.state.active_channel());
        match action {
            TickAction::Idle => {}
            TickAction::Stopped => self.timers.auto_read.clear(),
            TickAction::Read { point_id } => {
                let ok = self.read_point_by_id(&point_id, ReadOptions::silent()).await;
                if !ok {
                    self.scheduler.on_read_failed();
                    self.timers.auto_read.clear();
                }
            }
        }
    }

    // ── Point I/O ───────────────────────────────────────────────────

    /// Manual single-shot read; on success, chains an auto-read session onto
    /// the same point (when the channel has auto-read enabled).
    pub async fn read_point(&mut self, point_id: &str) {
        if !self.read_point_by_id(point_id, ReadOptions::default()).await {
            return;
        }
        self.start_auto_read(point_id);
    }

    async fn read_point_by_id(&mut self, point_id: &str, opts: ReadOptions) -> bool {
        let Some(channel) = self.state.active_channel() else {
            if !opts.silent_error {
                self.notifier
                    .notify(Severity::Warning, "Select a channel first");
            }
            return false;
        };
        if !channel.connected {
            if !opts.silent_error {
                self.notifier
                    .notify(Severity::Warning, "Connect the channel first");
            }
            return false;
        }
        let key = channel.key.clone();
        let slave_id = channel.slave_id;

        let Some(point) = self.state.points(&key).iter().find(|p| p.id == point_id) else {
            if !opts.silent_error {
                self.warn(&CoreError::PointNotFound);
            }
            return false;
        };
        if !model::is_read_function_code(point.function_code) {
            if !opts.silent_error {
                self.warn(&CoreError::validation(
                    "Read supports function codes 01/02/03/04 only",
                ));
            }
            return false;
        }
        let request = ReadPointRequest {
            channel_key: key.clone(),
            slave_id,
            function_code: point.function_code,
            address: point.address,
            quantity: point.quantity,
        };
        let name = point.name.clone();

        if opts.show_busy {
            self.busy.row_id = point_id.to_owned();
        }
        let result = self.executor.read_point(request).await;
        if opts.show_busy && self.busy.row_id == point_id {
            self.busy.row_id.clear();
        }

        match result {
            Ok(data) => {
                if let Some(point) = self.state.point_mut(&key, point_id) {
                    point.value_text = data.values.join(", ");
                    point.last_error.clear();
                    point.updated_at = Some(Utc::now().timestamp_millis());
                }
                if !opts.silent_success {
                    self.notifier
                        .notify(Severity::Success, &format!("Read ok: {name}"));
                }
                true
            }
            Err(err) => {
                let message = CoreError::from(err).to_string();
                let now = Utc::now().timestamp_millis();
                if let Some(point) = self.state.point_mut(&key, point_id) {
                    point.last_error = message.clone();
                    point.updated_at = Some(now);
                }
                if let Some(channel) = self.state.channel_mut(&key) {
                    channel.last_error = message.clone();
                    channel.updated_at = Some(now);
                }
                if !opts.silent_error {
                    self.notifier.notify(Severity::Error, &message);
                }
                false
            }
        }
    }

    pub async fn write_point(&mut self, point_id: &str) {
        let Some(key) = self.connected_key_or_warn() else {
            return;
        };
        let Some(slave_id) = self.state.channel(&key).map(|c| c.slave_id) else {
            return;
        };
        let Some(point) = self.state.points(&key).iter().find(|p| p.id == point_id) else {
            self.warn(&CoreError::PointNotFound);
            return;
        };
        if !model::is_write_function_code(point.function_code) {
            self.warn(&CoreError::validation(
                "Write supports function codes 05/06/15/16 only",
            ));
            return;
        }
        let request = WritePointRequest {
            channel_key: key.clone(),
            slave_id,
            function_code: point.function_code,
            address: point.address,
            instruction: point.instruction.clone(),
        };
        let name = point.name.clone();

        self.busy.row_id = point_id.to_owned();
        let result = self.executor.write_point(request).await;
        if self.busy.row_id == point_id {
            self.busy.row_id.clear();
        }

        match result {
            Ok(_) => {
                if let Some(point) = self.state.point_mut(&key, point_id) {
                    point.last_error.clear();
                    point.updated_at = Some(Utc::now().timestamp_millis());
                }
                self.notifier
                    .notify(Severity::Success, &format!("Write ok: {name}"));
            }
            Err(err) => {
                let message = CoreError::from(err).to_string();
                if let Some(point) = self.state.point_mut(&key, point_id) {
                    point.last_error = message.clone();
                    point.updated_at = Some(Utc::now().timestamp_millis());
                }
                self.notifier.notify(Severity::Error, &message);
            }
        }
    }

    // ── Server-side polling ─────────────────────────────────────────

    pub async fn start_polling(&mut self, point_id: &str) {
        let Some(key) = self.connected_key_or_warn() else {
            return;
        };
        let Some(point) = self.state.points(&key).iter().find(|p| p.id == point_id) else {
            self.warn(&CoreError::PointNotFound);
            return;
        };
        if !model::is_read_function_code(point.function_code) {
            self.warn(&CoreError::validation(
                "Polling supports read function codes 01/02/03/04 only",
            ));
            return;
        }
        let (function_code, address, quantity, name) = (
            point.function_code,
            point.address,
            point.quantity,
            point.name.clone(),
        );

        // Polling and auto-read are mutually exclusive.
        self.stop_auto_read_silent();

        let Some((slave_id, interval_ms)) = self.state.channel_mut(&key).map(|channel| {
            alarm::normalize_poll_timeout_config(channel);
            alarm::reset_poll_timeout_state(channel);
            (channel.slave_id, channel.poll_interval_ms)
        }) else {
            return;
        };

        let result = self
            .executor
            .poll_start(PollStartRequest {
                channel_key: key.clone(),
                slave_id,
                function_code,
                address,
                quantity,
                interval_ms: Some(interval_ms),
            })
            .await;

        match result {
            Ok(data) => {
                if let Some(channel) = self.state.channel_mut(&key) {
                    channel.poll_running = data.running;
                    channel.poll_interval_ms = data.interval_ms;
                    channel.polling_row_id = point_id.to_owned();
                    channel.last_error.clear();
                }
                self.timers.snapshot.arm(SNAPSHOT_PERIOD);
                self.notifier
                    .notify(Severity::Success, &format!("Polling started: {name}"));
                self.sync_snapshot().await;
                self.on_state_changed();
            }
            Err(err) => self.report(err),
        }
    }

    pub async fn stop_polling(&mut self) {
        let Some(key) = self.connected_key_or_warn() else {
            return;
        };

        match self.executor.poll_stop(&key).await {
            Ok(_) => {
                if let Some(channel) = self.state.channel_mut(&key) {
                    channel.poll_running = false;
                    channel.polling_row_id.clear();
                    alarm::reset_poll_timeout_state(channel);
                }
                self.timers.snapshot.clear();
                self.timers.collect.clear();
                self.notifier.notify(Severity::Success, "Polling stopped");
                self.sync_snapshot().await;
            }
            Err(err) => self.report(err),
        }
    }

    /// One snapshot timer firing (or an eager sync after connect/poll-start).
    /// Pulls the backend's poll status, routes errors through the escalator,
    /// and mirrors the latest value onto the tracked point row.
    pub async fn sync_snapshot(&mut self) {
        let Some(channel) = self.state.active_channel() else {
            return;
        };
        if !channel.connected {
            return;
        }
        let key = channel.key.clone();

        self.busy.snapshot = true;
        let result = self.executor.poll_snapshot(&key).await;
        self.busy.snapshot = false;

        match result {
            Ok(snapshot) => {
                let mut interval_changed = false;
                if let Some(channel) = self.state.channel_mut(&key) {
                    interval_changed = channel.poll_interval_ms != snapshot.interval_ms;
                    channel.poll_running = snapshot.running;
                    channel.poll_interval_ms = snapshot.interval_ms;
                    channel.last_error = snapshot.last_error.clone().unwrap_or_default();
                    channel.updated_at = snapshot.updated_at;
                }

                match snapshot.last_error.as_deref().filter(|m| !m.is_empty()) {
                    Some(message) => self.route_polling_error(&key, message),
                    None => {
                        if let Some(channel) = self.state.channel_mut(&key) {
                            alarm::reset_poll_timeout_state(channel);
                        }
                    }
                }

                let polling_row_id = self
                    .state
                    .channel(&key)
                    .map(|c| c.polling_row_id.clone())
                    .unwrap_or_default();
                if let Some(latest) = snapshot.latest.as_ref() {
                    if !polling_row_id.is_empty() {
                        if let Some(point) = self.state.point_mut(&key, &polling_row_id) {
                            point.value_text = latest.values.join(", ");
                            point.last_error.clear();
                            point.updated_at = Some(Utc::now().timestamp_millis());
                        }
                    }
                }

                if !snapshot.running {
                    if let Some(channel) = self.state.channel_mut(&key) {
                        channel.polling_row_id.clear();
                    }
                    self.timers.snapshot.clear();
                }
                if interval_changed {
                    self.schedule_persist();
                }
            }
            Err(err) => {
                let message = CoreError::from(err).to_string();
                if let Some(channel) = self.state.channel_mut(&key) {
                    channel.last_error = message.clone();
                    channel.updated_at = Some(Utc::now().timestamp_millis());
                }
                self.route_polling_error(&key, &message);
            }
        }
    }

    // ── Topology ────────────────────────────────────────────────────

    /// Add a gateway with one channel per slave id in `[start, end]` and
    /// activate its first channel. Returns false when validation fails.
    pub fn add_gateway_with_range(
        &mut self,
        name: &str,
        start_slave_id: i64,
        end_slave_id: i64,
    ) -> bool {
        let name = name.trim();
        if name.is_empty() {
            self.warn(&CoreError::validation("Gateway name required"));
            return false;
        }
        if start_slave_id < i64::from(SLAVE_ID_MIN)
            || end_slave_id > i64::from(SLAVE_ID_MAX)
            || start_slave_id > end_slave_id
        {
            self.warn(&CoreError::validation(
                "Slave range invalid: expected 1-247 with start <= end",
            ));
            return false;
        }

        let mut gateway = model::default_gateway(self.state.gateways.len());
        gateway.name = name.to_owned();

        self.stop_auto_read_silent();

        let mut first_key = None;
        for slave_id in start_slave_id..=end_slave_id {
            let channel = model::channel_from_gateway(&gateway, slave_id as u8);
            if first_key.is_none() {
                first_key = Some(channel.key.clone());
            }
            self.state
                .points_by_channel
                .insert(channel.key.clone(), model::default_rows());
            self.state.channels.push(channel);
        }
        self.state.gateways.push(gateway);
        if let Some(key) = first_key {
            self.state.active_channel_key = key;
        }
        self.on_state_changed();
        true
    }

    pub fn update_gateway_name(&mut self, gateway_id: &str, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        if let Some(gateway) = self.state.gateways.iter_mut().find(|g| g.id == gateway_id) {
            gateway.name = name.to_owned();
            self.on_state_changed();
        }
    }

    /// Remove a channel (and its gateway when it was the last one under it).
    /// Remote cleanup for a connected channel is best-effort; local removal
    /// always proceeds.
    pub async fn remove_channel(&mut self, channel_key: &str) {
        if self.state.channels.len() <= 1 {
            self.notifier
                .notify(Severity::Warning, "At least one channel must remain");
            return;
        }
        let Some(target) = self.state.channel(channel_key).cloned() else {
            return;
        };

        if target.connected {
            if target.poll_running {
                if let Err(err) = self.executor.poll_stop(&target.key).await {
                    debug!("poll stop during channel removal failed: {err}");
                }
            }
            if let Err(err) = self.executor.disconnect(&target.key).await {
                debug!("disconnect during channel removal failed: {err}");
            }
        }

        if self.scheduler.stop_for_channel(channel_key) {
            self.timers.auto_read.clear();
        }
        if target.poll_running {
            self.timers.snapshot.clear();
        }

        self.state.channels.retain(|c| c.key != channel_key);
        self.state.points_by_channel.remove(channel_key);

        let linked: BTreeSet<String> = self
            .state
            .channels
            .iter()
            .map(|c| c.gateway_id.clone())
            .collect();
        self.state.gateways.retain(|g| linked.contains(&g.id));

        if self.state.active_channel_key == channel_key {
            self.state.active_channel_key = self
                .state
                .channels
                .first()
                .map(|c| c.key.clone())
                .unwrap_or_default();
        }
        self.on_state_changed();
    }

    pub fn set_active_channel(&mut self, channel_key: &str) {
        if self.state.channel(channel_key).is_none() {
            self.warn(&CoreError::ChannelNotFound);
            return;
        }
        self.state.active_channel_key = channel_key.to_owned();
        self.on_state_changed();
    }

    pub fn update_channel_settings(&mut self, patch: ChannelPatch) {
        let Some(key) = self.active_key_or_warn() else {
            return;
        };
        if let Some(channel) = self.state.channel_mut(&key) {
            if let Some(label) = patch.label {
                channel.label = label;
            }
            if let Some(station_code) = patch.station_code {
                channel.station_code = station_code;
            }
            if let Some(host) = patch.host {
                channel.host = host;
            }
            if let Some(port) = patch.port {
                channel.port = port;
            }
            if let Some(poll_interval_ms) = patch.poll_interval_ms {
                channel.poll_interval_ms = poll_interval_ms;
            }
            if let Some(timeout_ms) = patch.poll_read_timeout_ms {
                channel.poll_read_timeout_ms = timeout_ms;
            }
            if let Some(retry_count) = patch.poll_read_retry_count {
                channel.poll_read_retry_count = retry_count;
            }
        }
        self.on_state_changed();
    }

    // ── Point rows ──────────────────────────────────────────────────

    /// Append `count` contiguous rows starting at `start_address`. Returns
    /// false when validation fails.
    pub fn append_points_by_batch(
        &mut self,
        count: i64,
        function_code: u8,
        start_address: i64,
    ) -> bool {
        let Some(key) = self.active_key_or_warn() else {
            return false;
        };
        let Ok(count) = u32::try_from(count) else {
            self.warn(&CoreError::validation("Point count must be at least 1"));
            return false;
        };
        if count < 1 {
            self.warn(&CoreError::validation("Point count must be at least 1"));
            return false;
        }
        let Ok(start_address) = u32::try_from(start_address) else {
            self.warn(&CoreError::validation(
                "Start address must be zero or a positive integer",
            ));
            return false;
        };

        let payload = BatchPointPayload {
            count,
            function_code,
            start_address,
        };
        let existing = self.state.points_mut(&key).len();
        let rows = model::point_rows_by_batch(&payload, existing);
        self.state.points_mut(&key).extend(rows);
        self.on_state_changed();
        true
    }

    /// Remove a point row, unlinking any auto-read or poll-tracking state
    /// referencing it.
    pub fn remove_point(&mut self, point_id: &str) {
        let Some(key) = self.active_key_or_warn() else {
            return;
        };
        if self.scheduler.stop_for_point(point_id) {
            self.timers.auto_read.clear();
        }
        if let Some(channel) = self.state.channel_mut(&key) {
            if channel.polling_row_id == point_id {
                channel.polling_row_id.clear();
            }
        }
        self.state.points_mut(&key).retain(|p| p.id != point_id);
        self.selected_point_ids.retain(|id| id != point_id);
        self.collecting_point_ids.retain(|id| id != point_id);
        self.on_state_changed();
    }

    pub fn update_point(&mut self, point_id: &str, patch: PointPatch) {
        let Some(key) = self.active_key_or_warn() else {
            return;
        };
        if let Some(point) = self.state.point_mut(&key, point_id) {
            if let Some(name) = patch.name {
                point.name = name;
            }
            if let Some(function_code) = patch.function_code {
                point.function_code = function_code;
            }
            if let Some(address) = patch.address {
                point.address = address;
            }
            if let Some(quantity) = patch.quantity {
                point.quantity = quantity;
            }
            if let Some(instruction) = patch.instruction {
                point.instruction = instruction;
            }
        }
        self.on_state_changed();
    }

    // ── Configuration sync ──────────────────────────────────────────

    pub async fn set_config_mode(&mut self, mode: SyncMode) {
        if self.sync_mode == mode {
            return;
        }
        self.sync_mode = mode;
        match mode {
            SyncMode::Online => self.load_config_from_remote().await,
            SyncMode::Offline => self
                .notifier
                .notify(Severity::Info, "Switched to offline configuration mode"),
        }
    }

    /// Replace the local topology with the executor's stored configuration.
    pub async fn load_config_from_remote(&mut self) {
        self.busy.sync = true;
        let result = self
            .executor
            .config_load(ConfigLoadRequest {
                active_channel_key: Some(self.state.active_channel_key.clone()),
            })
            .await;
        self.busy.sync = false;

        match result {
            Ok(data) => {
                self.stop_auto_read_silent();
                self.timers.snapshot.clear();

                self.state.gateways = data
                    .gateways
                    .into_iter()
                    .map(convert::gateway_from_config)
                    .collect();
                self.state.channels = data
                    .channels
                    .into_iter()
                    .map(convert::channel_from_config)
                    .collect();
                self.state.points_by_channel = data
                    .points_by_channel
                    .into_iter()
                    .map(|(key, rows)| {
                        (
                            key,
                            rows.into_iter().map(convert::point_from_config).collect(),
                        )
                    })
                    .collect();
                self.state.active_channel_key = if data.active_channel_key.is_empty() {
                    self.state
                        .channels
                        .first()
                        .map(|c| c.key.clone())
                        .unwrap_or_default()
                } else {
                    data.active_channel_key
                };

                self.selected_point_ids.clear();
                self.collecting_point_ids.clear();
                self.notifier
                    .notify(Severity::Success, "Online configuration loaded");
                self.on_state_changed();
            }
            Err(err) => self.report(err),
        }
    }

    /// Save the topology to the executor's database. Returns false on
    /// failure; in offline mode a duplicate-gateway-name rejection without
    /// `auto_rename_duplicate_gateway` returns false silently so the caller
    /// can retry with renaming enabled.
    pub async fn save_config_to_remote(&mut self, auto_rename_duplicate_gateway: bool) -> bool {
        self.busy.sync = true;
        let request = self.build_config_payload(auto_rename_duplicate_gateway);
        let result = self.executor.config_save(request).await;
        self.busy.sync = false;

        match result {
            Ok(data) => {
                self.notifier.notify(
                    Severity::Success,
                    &format!(
                        "Configuration saved ({}): {}",
                        data.mode,
                        data.saved_gateway_names.join(", ")
                    ),
                );
                if self.sync_mode == SyncMode::Online {
                    self.load_config_from_remote().await;
                }
                true
            }
            Err(err) => {
                let message = CoreError::from(err).to_string();
                if self.sync_mode == SyncMode::Offline
                    && !auto_rename_duplicate_gateway
                    && message.contains("duplicate gateway name")
                {
                    return false;
                }
                self.notifier.notify(Severity::Error, &message);
                false
            }
        }
    }

    fn build_config_payload(&self, auto_rename_duplicate_gateway: bool) -> ConfigSaveRequest {
        ConfigSaveRequest {
            mode: self.sync_mode.as_str().to_owned(),
            active_channel_key: self.state.active_channel_key.clone(),
            gateways: self
                .state
                .gateways
                .iter()
                .map(convert::gateway_to_config)
                .collect(),
            channels: self
                .state
                .channels
                .iter()
                .map(convert::channel_to_config)
                .collect(),
            points_by_channel: self
                .state
                .points_by_channel
                .iter()
                .map(|(key, rows)| {
                    (
                        key.clone(),
                        rows.iter().map(convert::point_to_config).collect(),
                    )
                })
                .collect(),
            auto_rename_duplicate_gateway,
        }
    }

    // ── Collection & telemetry ──────────────────────────────────────

    pub fn set_point_selection(&mut self, point_ids: Vec<String>) {
        self.selected_point_ids = point_ids;
    }

    /// Mark the selected points (or all of them) as collect targets, both
    /// remotely and on the local rows.
    pub async fn apply_collect_points(&mut self, apply_all: bool) {
        let Some(key) = self.active_key_or_warn() else {
            return;
        };
        let point_ids: Vec<String> = if apply_all {
            self.state.points(&key).iter().map(|p| p.id.clone()).collect()
        } else {
            self.selected_point_ids.clone()
        };
        if !apply_all && point_ids.is_empty() {
            self.warn(&CoreError::validation("Select points first"));
            return;
        }

        self.busy.collect = true;
        let result = self
            .executor
            .collect_points_set(CollectPointsRequest {
                channel_key: key.clone(),
                point_ids: point_ids.clone(),
                apply_all,
            })
            .await;
        self.busy.collect = false;

        match result {
            Ok(data) => {
                let allowed: BTreeSet<&String> = point_ids.iter().collect();
                for row in self.state.points_mut(&key).iter_mut() {
                    row.collect_enabled = apply_all || allowed.contains(&row.id);
                }
                self.collecting_point_ids = self
                    .state
                    .points(&key)
                    .iter()
                    .filter(|p| p.collect_enabled)
                    .map(|p| p.id.clone())
                    .collect();
                self.notifier.notify(
                    Severity::Success,
                    &format!("Collect points saved: {} rows", data.updated_count),
                );
                self.on_state_changed();
            }
            Err(err) => self.report(err),
        }
    }

    /// One collect timer firing: silently read every collect-enabled point
    /// and submit the successful samples in one telemetry batch. Ingest
    /// failures are logged, never surfaced.
    pub async fn tick_collect(&mut self) {
        let Some(channel) = self.state.active_channel() else {
            return;
        };
        if !channel.connected {
            return;
        }
        let key = channel.key.clone();
        let host = channel.host.clone();
        let port = channel.port;
        let slave_id = channel.slave_id;
        let Some(gateway_name) = self.state.active_gateway().map(|g| g.name.clone()) else {
            return;
        };
        if gateway_name.is_empty() {
            return;
        }

        let targets: Vec<String> = self
            .state
            .points(&key)
            .iter()
            .filter(|p| p.collect_enabled)
            .map(|p| p.id.clone())
            .collect();
        if targets.is_empty() {
            return;
        }

        let mut samples = Vec::new();
        for point_id in targets {
            if !self.read_point_by_id(&point_id, ReadOptions::silent()).await {
                continue;
            }
            let Some(point) = self.state.points(&key).iter().find(|p| p.id == point_id) else {
                continue;
            };
            let values: Vec<String> = point
                .value_text
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty() && *v != "--")
                .map(str::to_owned)
                .collect();
            samples.push(TelemetrySample {
                sampled_at_millis: Some(Utc::now().timestamp_millis()),
                gateway_name: gateway_name.clone(),
                channel_key: key.clone(),
                host: host.clone(),
                port,
                slave_id,
                point_id: point.id.clone(),
                point_name: point.name.clone(),
                function_code: point.function_code,
                address: point.address,
                quantity: point.quantity,
                values,
            });
        }
        if samples.is_empty() {
            return;
        }

        if let Err(err) = self
            .executor
            .telemetry_ingest(TelemetryIngestRequest { samples })
            .await
        {
            warn!("telemetry ingest failed: {err}");
        }
    }
}
