//! Integration tests for the session orchestrator, driven through a scripted
//! executor. Timers are never run here — the tests assert on the timer slots
//! the page arms/clears and invoke tick handlers directly.
#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use modwatch_api::types::{
    CollectPointsData, CollectPointsRequest, ConfigLoadData, ConfigLoadRequest, ConfigSaveData,
    ConfigSaveRequest, ConnectData, ConnectRequest, DisconnectData, PollIntervalData,
    PollSnapshotData, PollStartData, PollStartRequest, PollStopData, ReadPointData,
    ReadPointRequest, TelemetryIngestData, TelemetryIngestRequest, WritePointData,
    WritePointRequest,
};
use modwatch_api::{Error as ApiError, ModbusExecutor};
use modwatch_core::notify::{Notifier, Severity};
use modwatch_core::page::SessionPage;
use modwatch_core::persist::StatePersistence;
use modwatch_core::SessionState;
use pretty_assertions::assert_eq;

const KEY: &str = "gateway-1-id-1";

fn exec_err(message: &str) -> ApiError {
    ApiError::Executor {
        message: message.into(),
    }
}

fn snapshot(running: bool, last_error: Option<&str>) -> PollSnapshotData {
    PollSnapshotData {
        channel_key: KEY.into(),
        running,
        interval_ms: 1000,
        latest: None,
        last_error: last_error.map(Into::into),
        updated_at: Some(1_700_000_000_000),
    }
}

// ── Scripted executor ───────────────────────────────────────────────

#[derive(Default)]
struct MockExecutor {
    calls: Mutex<Vec<String>>,
    connect_error: Mutex<Option<String>>,
    disconnect_error: Mutex<Option<String>>,
    save_error: Mutex<Option<String>>,
    read_outcomes: Mutex<VecDeque<Result<Vec<String>, String>>>,
    snapshots: Mutex<VecDeque<PollSnapshotData>>,
}

impl MockExecutor {
    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_owned());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_connect(&self, message: &str) {
        *self.connect_error.lock().unwrap() = Some(message.to_owned());
    }

    fn fail_disconnect(&self, message: &str) {
        *self.disconnect_error.lock().unwrap() = Some(message.to_owned());
    }

    fn fail_save(&self, message: &str) {
        *self.save_error.lock().unwrap() = Some(message.to_owned());
    }

    fn queue_read(&self, outcome: Result<Vec<&str>, &str>) {
        let outcome = match outcome {
            Ok(values) => Ok(values.into_iter().map(str::to_owned).collect()),
            Err(message) => Err(message.to_owned()),
        };
        self.read_outcomes.lock().unwrap().push_back(outcome);
    }

    fn queue_snapshot(&self, data: PollSnapshotData) {
        self.snapshots.lock().unwrap().push_back(data);
    }
}

#[async_trait]
impl ModbusExecutor for MockExecutor {
    async fn connect(&self, req: ConnectRequest) -> Result<ConnectData, ApiError> {
        self.record("connect");
        if let Some(message) = self.connect_error.lock().unwrap().clone() {
            return Err(exec_err(&message));
        }
        Ok(ConnectData {
            channel_key: req.channel_key,
            endpoint: format!("{}:{}", req.host, req.port),
            slave_id: req.slave_id,
            poll_interval_ms: 1000,
        })
    }

    async fn disconnect(&self, channel_key: &str) -> Result<DisconnectData, ApiError> {
        self.record("disconnect");
        if let Some(message) = self.disconnect_error.lock().unwrap().clone() {
            return Err(exec_err(&message));
        }
        Ok(DisconnectData {
            channel_key: channel_key.to_owned(),
            disconnected: true,
        })
    }

    async fn set_poll_interval(
        &self,
        channel_key: &str,
        interval_ms: u64,
    ) -> Result<PollIntervalData, ApiError> {
        self.record("set_poll_interval");
        Ok(PollIntervalData {
            channel_key: channel_key.to_owned(),
            interval_ms,
        })
    }

    async fn read_point(&self, req: ReadPointRequest) -> Result<ReadPointData, ApiError> {
        self.record("read_point");
        let outcome = self
            .read_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec!["0".to_owned()]));
        match outcome {
            Ok(values) => Ok(ReadPointData {
                channel_key: req.channel_key,
                slave_id: req.slave_id,
                function_code: req.function_code,
                address: req.address,
                quantity: req.quantity,
                values,
            }),
            Err(message) => Err(exec_err(&message)),
        }
    }

    async fn write_point(&self, req: WritePointRequest) -> Result<WritePointData, ApiError> {
        self.record("write_point");
        Ok(WritePointData {
            channel_key: req.channel_key,
            slave_id: req.slave_id,
            function_code: req.function_code,
            address: req.address,
            quantity: 1,
            accepted: true,
        })
    }

    async fn poll_start(&self, req: PollStartRequest) -> Result<PollStartData, ApiError> {
        self.record("poll_start");
        Ok(PollStartData {
            channel_key: req.channel_key,
            running: true,
            interval_ms: req.interval_ms.unwrap_or(1000),
        })
    }

    async fn poll_stop(&self, channel_key: &str) -> Result<PollStopData, ApiError> {
        self.record("poll_stop");
        Ok(PollStopData {
            channel_key: channel_key.to_owned(),
            running: false,
        })
    }

    async fn poll_snapshot(&self, _channel_key: &str) -> Result<PollSnapshotData, ApiError> {
        self.record("poll_snapshot");
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| snapshot(false, None)))
    }

    async fn config_load(&self, _req: ConfigLoadRequest) -> Result<ConfigLoadData, ApiError> {
        self.record("config_load");
        Ok(ConfigLoadData {
            gateways: Vec::new(),
            channels: Vec::new(),
            points_by_channel: BTreeMap::new(),
            active_channel_key: String::new(),
        })
    }

    async fn config_save(&self, req: ConfigSaveRequest) -> Result<ConfigSaveData, ApiError> {
        self.record("config_save");
        if let Some(message) = self.save_error.lock().unwrap().clone() {
            return Err(exec_err(&message));
        }
        Ok(ConfigSaveData {
            mode: req.mode,
            saved_gateway_names: req.gateways.into_iter().map(|g| g.name).collect(),
        })
    }

    async fn collect_points_set(
        &self,
        req: CollectPointsRequest,
    ) -> Result<CollectPointsData, ApiError> {
        self.record("collect_points_set");
        Ok(CollectPointsData {
            channel_key: req.channel_key,
            updated_count: req.point_ids.len() as u64,
        })
    }

    async fn telemetry_ingest(
        &self,
        req: TelemetryIngestRequest,
    ) -> Result<TelemetryIngestData, ApiError> {
        self.record("telemetry_ingest");
        Ok(TelemetryIngestData {
            inserted: req.samples.len() as u64,
        })
    }
}

// ── Recording ports ─────────────────────────────────────────────────

#[derive(Default)]
struct RecordingNotifier {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl RecordingNotifier {
    fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }

    fn count_of(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((severity, message.to_owned()));
    }
}

#[derive(Default)]
struct MemoryPersistence {
    stored: Mutex<Option<SessionState>>,
    saves: AtomicUsize,
}

#[async_trait]
impl StatePersistence for MemoryPersistence {
    async fn load(&self) -> Option<SessionState> {
        self.stored.lock().unwrap().clone()
    }

    async fn save(&self, state: SessionState) {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = Some(state);
    }
}

// ── Harness ─────────────────────────────────────────────────────────

struct Harness {
    executor: Arc<MockExecutor>,
    notifier: Arc<RecordingNotifier>,
    persistence: Arc<MemoryPersistence>,
    page: SessionPage,
}

async fn harness() -> Harness {
    harness_with_persisted(None).await
}

async fn harness_with_persisted(persisted: Option<SessionState>) -> Harness {
    let executor = Arc::new(MockExecutor::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let persistence = Arc::new(MemoryPersistence::default());
    *persistence.stored.lock().unwrap() = persisted;

    let mut page = SessionPage::new(executor.clone(), persistence.clone(), notifier.clone());
    page.restore_persisted_state().await;

    Harness {
        executor,
        notifier,
        persistence,
        page,
    }
}

impl Harness {
    /// Id of the nth default point row on the default channel.
    fn point_id(&self, index: usize) -> String {
        self.page.state().points(KEY)[index].id.clone()
    }
}

async fn connected_harness() -> Harness {
    let mut h = harness().await;
    h.page.connect_channel().await;
    assert!(h.page.state().channel(KEY).unwrap().connected);
    h
}

// ── Connection ──────────────────────────────────────────────────────

#[tokio::test]
async fn connect_success_marks_channel_up_and_schedules_persist() {
    let mut h = harness().await;
    h.page.connect_channel().await;

    let channel = h.page.state().channel(KEY).unwrap();
    assert!(channel.connected);
    assert_eq!(channel.endpoint, "127.0.0.1:502");
    assert_eq!(channel.poll_interval_ms, 1000);
    assert!(h.notifier.contains("Channel connected: 127.0.0.1:502"));
    assert!(h.page.timers().persist.is_armed());

    // Connecting also syncs the poll snapshot eagerly.
    assert!(h.executor.calls().contains(&"poll_snapshot".to_owned()));
}

#[tokio::test]
async fn connect_failure_keeps_channel_down() {
    let mut h = harness().await;
    h.executor.fail_connect("connection refused");
    h.page.connect_channel().await;

    let channel = h.page.state().channel(KEY).unwrap();
    assert!(!channel.connected);
    assert_eq!(channel.endpoint, "");
    assert!(h.notifier.contains("connection refused"));
    assert_eq!(h.notifier.count_of(Severity::Success), 0);
}

#[tokio::test]
async fn disconnect_cleans_up_locally_even_when_remote_fails() {
    let mut h = connected_harness().await;
    h.page.set_auto_read_enabled(true);
    h.page.read_point(&h.point_id(0)).await;
    assert!(h.page.is_auto_read_running());

    h.executor.fail_disconnect("executor unavailable");
    h.page.disconnect_channel().await;

    let channel = h.page.state().channel(KEY).unwrap();
    assert!(!channel.connected);
    assert!(!channel.poll_running);
    assert_eq!(channel.polling_row_id, "");
    assert_eq!(channel.endpoint, "");
    assert!(!h.page.is_auto_read_running());
    assert!(!h.page.timers().auto_read.is_armed());
    assert!(!h.page.timers().snapshot.is_armed());
    assert!(h.notifier.contains("executor unavailable"));
}

// ── Point I/O and auto-read ─────────────────────────────────────────

#[tokio::test]
async fn manual_read_updates_value_and_chains_auto_read() {
    let mut h = connected_harness().await;
    h.page.set_auto_read_enabled(true);
    h.executor.queue_read(Ok(vec!["12", "13"]));

    let point_id = h.point_id(0);
    h.page.read_point(&point_id).await;

    let point = &h.page.state().points(KEY)[0];
    assert_eq!(point.value_text, "12, 13");
    assert_eq!(point.last_error, "");
    assert!(point.updated_at.is_some());
    assert!(h.notifier.contains("Read ok: Coil status 0"));

    assert!(h.page.is_auto_read_running());
    assert_eq!(h.page.auto_read_point_id(), Some(point_id.as_str()));
    assert_eq!(
        h.page.timers().auto_read.period(),
        Some(Duration::from_millis(1000))
    );
    assert!(h.notifier.contains("Auto-read refresh started: 1000 ms"));
}

#[tokio::test]
async fn auto_read_does_not_start_when_disabled() {
    let mut h = connected_harness().await;
    h.page.read_point(&h.point_id(0)).await;

    assert!(!h.page.is_auto_read_running());
    assert!(!h.page.timers().auto_read.is_armed());
}

#[tokio::test]
async fn auto_read_tick_failure_stops_without_operator_noise() {
    let mut h = connected_harness().await;
    h.page.set_auto_read_enabled(true);
    h.page.read_point(&h.point_id(0)).await;
    assert!(h.page.is_auto_read_running());

    let errors_before = h.notifier.count_of(Severity::Error);
    h.executor.queue_read(Err("bus fault"));
    h.page.tick_auto_read().await;

    assert!(!h.page.is_auto_read_running());
    assert!(!h.page.timers().auto_read.is_armed());
    assert_eq!(h.notifier.count_of(Severity::Error), errors_before);
    // The failure is still recorded on the row.
    assert_eq!(h.page.state().points(KEY)[0].last_error, "bus fault");
}

#[tokio::test]
async fn read_rejects_write_class_function_codes() {
    let mut h = connected_harness().await;
    let point_id = h.point_id(0);
    h.page.update_point(
        &point_id,
        modwatch_core::PointPatch {
            function_code: Some(6),
            ..Default::default()
        },
    );

    h.page.read_point(&point_id).await;
    assert!(h.notifier.contains("Read supports function codes 01/02/03/04 only"));
}

#[tokio::test]
async fn write_rejects_read_class_function_codes() {
    let mut h = connected_harness().await;
    // Default row 0 is a coil-status read point (function code 1).
    h.page.write_point(&h.point_id(0)).await;
    assert!(h.notifier.contains("Write supports function codes 05/06/15/16 only"));

    let point_id = h.point_id(0);
    h.page.update_point(
        &point_id,
        modwatch_core::PointPatch {
            function_code: Some(5),
            ..Default::default()
        },
    );
    h.page.write_point(&point_id).await;
    assert!(h.notifier.contains("Write ok: Coil status 0"));
}

// ── Mutual exclusion ────────────────────────────────────────────────

#[tokio::test]
async fn starting_polling_stops_auto_read() {
    let mut h = connected_harness().await;
    h.page.set_auto_read_enabled(true);
    h.page.read_point(&h.point_id(0)).await;
    assert!(h.page.is_auto_read_running());

    h.executor.queue_snapshot(snapshot(true, None));
    h.page.start_polling(&h.point_id(1)).await;

    assert!(!h.page.is_auto_read_running());
    assert!(!h.page.timers().auto_read.is_armed());
    let channel = h.page.state().channel(KEY).unwrap();
    assert!(channel.poll_running);
    assert_eq!(channel.polling_row_id, h.point_id(1));
    assert!(h.page.timers().snapshot.is_armed());
    assert!(h.notifier.contains("Polling started: Holding register 0"));
}

#[tokio::test]
async fn auto_read_is_blocked_while_polling_runs() {
    let mut h = connected_harness().await;
    h.page.set_auto_read_enabled(true);
    h.executor.queue_snapshot(snapshot(true, None));
    h.page.start_polling(&h.point_id(1)).await;

    h.page.read_point(&h.point_id(0)).await;
    assert!(!h.page.is_auto_read_running());
    assert!(h.notifier.contains("Backend polling is running"));
}

#[tokio::test]
async fn stopping_polling_clears_tracking_and_timers() {
    let mut h = connected_harness().await;
    h.executor.queue_snapshot(snapshot(true, None));
    h.page.start_polling(&h.point_id(1)).await;

    h.page.stop_polling().await;
    let channel = h.page.state().channel(KEY).unwrap();
    assert!(!channel.poll_running);
    assert_eq!(channel.polling_row_id, "");
    assert!(!h.page.timers().snapshot.is_armed());
    assert!(h.notifier.contains("Polling stopped"));
}

// ── Poll-timeout escalation ─────────────────────────────────────────

#[tokio::test]
async fn repeated_timeouts_escalate_and_force_the_channel_down() {
    let mut h = connected_harness().await;
    // threshold = 5000 ms x 3 retries; one timeout-like snapshot per sync.
    for _ in 0..3 {
        h.executor
            .queue_snapshot(snapshot(true, Some("modbus read timeout")));
    }
    h.page.start_polling(&h.point_id(1)).await; // consumes the first snapshot
    h.page.sync_snapshot().await;

    let channel = h.page.state().channel(KEY).unwrap();
    assert!(channel.connected, "still up below the threshold");
    assert_eq!(channel.poll_read_timeout_hit_count, 2);

    h.page.sync_snapshot().await;
    let channel = h.page.state().channel(KEY).unwrap();
    assert!(!channel.connected);
    assert!(!channel.poll_running);
    assert!(channel.poll_read_alarm);
    assert!(!h.page.timers().snapshot.is_armed());
    assert!(h.notifier.contains("Poll read alarm: timeout 5000ms x 3 retries = 15000ms"));
    assert_eq!(
        h.page.poll_alarm_message(),
        "Poll read alarm: timeout 5000ms x 3 retries = 15000ms"
    );
}

#[tokio::test]
async fn unrelated_snapshot_error_resets_the_timeout_budget() {
    let mut h = connected_harness().await;
    h.executor
        .queue_snapshot(snapshot(true, Some("modbus read timeout")));
    h.page.start_polling(&h.point_id(1)).await;
    assert_eq!(
        h.page.state().channel(KEY).unwrap().poll_read_timeout_hit_count,
        1
    );

    h.executor
        .queue_snapshot(snapshot(true, Some("illegal data address")));
    h.page.sync_snapshot().await;
    let channel = h.page.state().channel(KEY).unwrap();
    assert_eq!(channel.poll_read_timeout_hit_count, 0);
    assert!(channel.connected);
}

// ── Topology ────────────────────────────────────────────────────────

#[tokio::test]
async fn add_gateway_creates_one_channel_per_slave_and_activates_the_first() {
    let mut h = harness().await;
    assert!(h.page.add_gateway_with_range("Plant B", 2, 4));

    let state = h.page.state();
    assert_eq!(state.gateways.len(), 2);
    assert_eq!(state.channels.len(), 4);
    assert_eq!(state.active_channel_key, "gateway-2-id-2");
    for slave_id in 2..=4 {
        let key = format!("gateway-2-id-{slave_id}");
        assert!(state.channel(&key).is_some());
        assert_eq!(state.points(&key).len(), 2);
    }
}

#[tokio::test]
async fn add_gateway_rejects_bad_input() {
    let mut h = harness().await;
    assert!(!h.page.add_gateway_with_range("   ", 1, 2));
    assert!(h.notifier.contains("Gateway name required"));

    assert!(!h.page.add_gateway_with_range("Plant B", 5, 3));
    assert!(!h.page.add_gateway_with_range("Plant B", 0, 3));
    assert!(!h.page.add_gateway_with_range("Plant B", 1, 300));
    assert!(h.notifier.contains("Slave range invalid"));
    assert_eq!(h.page.state().channels.len(), 1);
}

#[tokio::test]
async fn last_channel_cannot_be_removed() {
    let mut h = harness().await;
    h.page.remove_channel(KEY).await;

    assert!(h.notifier.contains("At least one channel must remain"));
    assert_eq!(h.page.state().channels.len(), 1);
}

#[tokio::test]
async fn removing_the_last_channel_of_a_gateway_drops_the_gateway() {
    let mut h = harness().await;
    h.page.add_gateway_with_range("Plant B", 2, 2);
    assert_eq!(h.page.state().gateways.len(), 2);

    h.page.remove_channel("gateway-2-id-2").await;
    let state = h.page.state();
    assert_eq!(state.gateways.len(), 1);
    assert_eq!(state.gateways[0].name, "Gateway 1");
    assert_eq!(state.active_channel_key, KEY);
    assert!(state.points_by_channel.get("gateway-2-id-2").is_none());
}

#[tokio::test]
async fn removing_a_connected_polling_channel_tears_it_down_remotely() {
    let mut h = connected_harness().await;
    h.executor.queue_snapshot(snapshot(true, None));
    h.page.start_polling(&h.point_id(1)).await;
    h.page.add_gateway_with_range("Plant B", 2, 2);

    h.page.remove_channel(KEY).await;

    let calls = h.executor.calls();
    assert!(calls.contains(&"poll_stop".to_owned()));
    assert!(calls.contains(&"disconnect".to_owned()));
    assert!(h.page.state().channel(KEY).is_none());
    assert!(!h.page.timers().snapshot.is_armed());
}

#[tokio::test]
async fn batch_append_validates_and_creates_contiguous_rows() {
    let mut h = harness().await;
    assert!(!h.page.append_points_by_batch(0, 3, 0));
    assert!(h.notifier.contains("Point count must be at least 1"));
    assert!(!h.page.append_points_by_batch(3, 3, -1));
    assert!(h.notifier.contains("Start address must be zero or a positive integer"));

    assert!(h.page.append_points_by_batch(3, 4, 100));
    let rows = h.page.state().points(KEY);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[2].address, 100);
    assert_eq!(rows[3].address, 101);
    assert_eq!(rows[4].address, 102);
    assert_eq!(rows[4].function_code, 4);
}

#[tokio::test]
async fn removing_the_auto_read_point_stops_the_session() {
    let mut h = connected_harness().await;
    h.page.set_auto_read_enabled(true);
    let point_id = h.point_id(0);
    h.page.read_point(&point_id).await;
    assert!(h.page.is_auto_read_running());

    h.page.remove_point(&point_id);
    assert!(!h.page.is_auto_read_running());
    assert!(!h.page.timers().auto_read.is_armed());
    assert_eq!(h.page.state().points(KEY).len(), 1);
}

// ── Persistence ─────────────────────────────────────────────────────

#[tokio::test]
async fn restore_replaces_state_without_scheduling_a_save() {
    let mut persisted = SessionState::new();
    persisted.gateways[0].name = "Saved gateway".into();
    let h = harness_with_persisted(Some(persisted)).await;

    assert_eq!(h.page.state().gateways[0].name, "Saved gateway");
    assert!(!h.page.timers().persist.is_armed());
    assert_eq!(h.persistence.saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mutations_debounce_a_save_and_flush_writes_it() {
    let mut h = harness().await;
    h.page.update_gateway_name("gateway-1", "Renamed");
    assert!(h.page.timers().persist.is_armed());

    h.page.flush_persist().await;
    assert!(!h.page.timers().persist.is_armed());
    assert_eq!(h.persistence.saves.load(Ordering::SeqCst), 1);
    let stored = h.persistence.stored.lock().unwrap().clone().unwrap();
    assert_eq!(stored.gateways[0].name, "Renamed");
}

#[tokio::test]
async fn shutdown_clears_timers_and_saves_once_more() {
    let mut h = connected_harness().await;
    h.page.set_auto_read_enabled(true);
    h.page.read_point(&h.point_id(0)).await;

    h.page.shutdown().await;
    assert!(!h.page.timers().auto_read.is_armed());
    assert!(!h.page.timers().persist.is_armed());
    assert_eq!(h.persistence.saves.load(Ordering::SeqCst), 1);
}

// ── Configuration sync ──────────────────────────────────────────────

#[tokio::test]
async fn offline_duplicate_gateway_rejection_returns_false_silently() {
    let mut h = harness().await;
    h.executor.fail_save("duplicate gateway name: Gateway 1");

    let saved = h.page.save_config_to_remote(false).await;
    assert!(!saved);
    assert_eq!(h.notifier.count_of(Severity::Error), 0);

    // With auto-rename requested the rejection is surfaced normally.
    let saved = h.page.save_config_to_remote(true).await;
    assert!(!saved);
    assert!(h.notifier.contains("duplicate gateway name"));
}

#[tokio::test]
async fn save_success_reports_saved_gateways() {
    let mut h = harness().await;
    let saved = h.page.save_config_to_remote(false).await;
    assert!(saved);
    assert!(h.notifier.contains("Configuration saved (offline): Gateway 1"));
}

// ── Collection & telemetry ──────────────────────────────────────────

#[tokio::test]
async fn apply_collect_points_marks_rows_and_arms_the_collect_timer() {
    let mut h = connected_harness().await;
    let point_id = h.point_id(0);
    h.page.set_point_selection(vec![point_id.clone()]);
    h.page.apply_collect_points(false).await;

    let rows = h.page.state().points(KEY);
    assert!(rows[0].collect_enabled);
    assert!(!rows[1].collect_enabled);
    assert!(h.notifier.contains("Collect points saved: 1 rows"));
    assert_eq!(
        h.page.timers().collect.period(),
        Some(Duration::from_millis(1000))
    );
}

#[tokio::test]
async fn apply_collect_points_requires_a_selection() {
    let mut h = connected_harness().await;
    h.page.apply_collect_points(false).await;
    assert!(h.notifier.contains("Select points first"));
    assert!(!h.page.timers().collect.is_armed());
}

#[tokio::test]
async fn collect_tick_reads_enabled_points_and_ingests_one_batch() {
    let mut h = connected_harness().await;
    h.page.set_point_selection(vec![h.point_id(0), h.point_id(1)]);
    h.page.apply_collect_points(false).await;

    h.executor.queue_read(Ok(vec!["7"]));
    h.executor.queue_read(Ok(vec!["8", "9"]));
    h.page.tick_collect().await;

    let calls = h.executor.calls();
    assert_eq!(
        calls.iter().filter(|c| c.as_str() == "telemetry_ingest").count(),
        1
    );
    assert_eq!(h.page.state().points(KEY)[0].value_text, "7");
    assert_eq!(h.page.state().points(KEY)[1].value_text, "8, 9");
}

#[tokio::test]
async fn collect_tick_is_a_no_op_while_disconnected() {
    let mut h = harness().await;
    h.page.tick_collect().await;
    assert!(h.executor.calls().is_empty());
}
