//! Session data model: gateways, channels, points, and the owned store.
//!
//! Builders are pure apart from the process time / randomness folded into
//! generated point ids (human-unique, not logically significant). The
//! orchestrator is the only writer of [`SessionState`]; sub-components
//! receive channel references for in-place status updates but never replace
//! model identities — keys and ids are immutable once created.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

// ── Limits ──────────────────────────────────────────────────────────

pub const AUTO_READ_MIN_INTERVAL_MS: u64 = 100;
pub const AUTO_READ_MAX_INTERVAL_MS: u64 = 60_000;
pub const POLL_INTERVAL_MIN_MS: u64 = 100;
pub const POLL_INTERVAL_MAX_MS: u64 = 60_000;
pub const POLL_READ_TIMEOUT_MIN_MS: u64 = 100;
pub const POLL_READ_TIMEOUT_MAX_MS: u64 = 60_000;
pub const POLL_READ_RETRY_MIN: u32 = 1;
pub const POLL_READ_RETRY_MAX: u32 = 20;
pub const SLAVE_ID_MIN: u8 = 1;
pub const SLAVE_ID_MAX: u8 = 247;

/// Read-class Modbus function codes (coils, discrete inputs, holding and
/// input registers). Polling and single-shot reads accept only these.
pub fn is_read_function_code(code: u8) -> bool {
    matches!(code, 1 | 2 | 3 | 4)
}

/// Write-class Modbus function codes (single/multiple coil and register
/// writes). Write operations accept only these.
pub fn is_write_function_code(code: u8) -> bool {
    matches!(code, 5 | 6 | 15 | 16)
}

// ── Entities ────────────────────────────────────────────────────────

/// A logical physical unit (e.g. a TCP-to-serial bridge) grouping channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    pub id: String,
    pub name: String,
}

/// One Modbus TCP session to a `(host, port, slave_id)` triple.
///
/// Durable config fields persist across restarts; the session-status fields
/// (`connected` through `poll_read_alarm`) are volatile and always reset on
/// save/load.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub key: String,
    pub label: String,
    pub gateway_id: String,
    pub station_code: String,
    pub host: String,
    pub port: u16,
    pub slave_id: u8,
    pub poll_interval_ms: u64,
    pub auto_read_enabled: bool,
    pub auto_read_interval_ms: u64,
    pub poll_read_timeout_ms: u64,
    pub poll_read_retry_count: u32,

    // Volatile session status.
    pub connected: bool,
    pub endpoint: String,
    pub poll_running: bool,
    pub polling_row_id: String,
    pub last_error: String,
    pub updated_at: Option<i64>,
    pub poll_read_timeout_hit_count: u32,
    pub poll_read_alarm: bool,
}

/// One addressable Modbus point within a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRow {
    pub id: String,
    pub name: String,
    pub function_code: u8,
    pub address: u32,
    pub quantity: u16,
    pub instruction: String,
    pub value_text: String,
    pub collect_enabled: bool,
    pub last_error: String,
    pub updated_at: Option<i64>,
}

/// Validated parameters for contiguous batch point creation.
#[derive(Debug, Clone, Copy)]
pub struct BatchPointPayload {
    pub count: u32,
    pub function_code: u8,
    pub start_address: u32,
}

// ── Builders ────────────────────────────────────────────────────────

fn gateway_id(index: usize) -> String {
    format!("gateway-{}", index + 1)
}

/// Derive a channel key from its gateway and slave id. Deterministic, so a
/// reconnect after reload reuses the same key.
pub fn channel_key(gateway_id: &str, slave_id: u8) -> String {
    format!("{gateway_id}-id-{slave_id}")
}

pub fn default_gateway(index: usize) -> Gateway {
    Gateway {
        id: gateway_id(index),
        name: format!("Gateway {}", index + 1),
    }
}

pub fn channel_from_gateway(gateway: &Gateway, slave_id: u8) -> Channel {
    let station_code = format!("GW-ID{slave_id}");
    Channel {
        key: channel_key(&gateway.id, slave_id),
        label: station_code.clone(),
        gateway_id: gateway.id.clone(),
        station_code,
        host: "127.0.0.1".into(),
        port: 502,
        slave_id,
        poll_interval_ms: 1000,
        auto_read_enabled: false,
        auto_read_interval_ms: 1000,
        poll_read_timeout_ms: 5000,
        poll_read_retry_count: 3,
        connected: false,
        endpoint: String::new(),
        poll_running: false,
        polling_row_id: String::new(),
        last_error: String::new(),
        updated_at: None,
        poll_read_timeout_hit_count: 0,
        poll_read_alarm: false,
    }
}

fn point_id(index: usize) -> String {
    let seed = Uuid::new_v4().simple().to_string();
    format!(
        "point-{}-{}-{}",
        Utc::now().timestamp_millis(),
        index,
        &seed[..6]
    )
}

pub fn point_row(index: usize) -> PointRow {
    PointRow {
        id: point_id(index),
        name: format!("Point {}", index + 1),
        function_code: 3,
        address: 0,
        quantity: 1,
        instruction: "1".into(),
        value_text: "--".into(),
        collect_enabled: false,
        last_error: String::new(),
        updated_at: None,
    }
}

/// The two starter rows every fresh channel gets: one coil-status point and
/// one holding-register point.
pub fn default_rows() -> Vec<PointRow> {
    let mut coil = point_row(0);
    coil.name = "Coil status 0".into();
    coil.function_code = 1;

    let mut holding = point_row(1);
    holding.name = "Holding register 0".into();
    holding.function_code = 3;

    vec![coil, holding]
}

/// Create `payload.count` rows with contiguous addresses
/// `[start_address, start_address + count)`, quantity 1, and the given
/// function code. Ids are unique within the call. Addresses saturate at
/// `u32::MAX` rather than wrapping.
pub fn point_rows_by_batch(payload: &BatchPointPayload, existing_count: usize) -> Vec<PointRow> {
    (0..payload.count as usize)
        .map(|offset| {
            let index = existing_count + offset;
            let mut row = point_row(index);
            row.name = format!("Point {}", index + 1);
            row.function_code = payload.function_code;
            row.address = payload.start_address.saturating_add(offset as u32);
            row.quantity = 1;
            row
        })
        .collect()
}

// ── Owned store ─────────────────────────────────────────────────────

/// The single owned session store: topology, configuration, and live
/// status. Invariants: channel keys unique, every channel's gateway
/// resolves, every channel key has a points list, at least one channel
/// exists.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub active_channel_key: String,
    pub gateways: Vec<Gateway>,
    pub channels: Vec<Channel>,
    pub points_by_channel: BTreeMap<String, Vec<PointRow>>,
}

impl SessionState {
    /// A fresh state: one default gateway with one channel at slave id 1.
    pub fn new() -> Self {
        let gateway = default_gateway(0);
        let channel = channel_from_gateway(&gateway, 1);
        let key = channel.key.clone();
        let mut points_by_channel = BTreeMap::new();
        points_by_channel.insert(key.clone(), default_rows());
        Self {
            active_channel_key: key,
            gateways: vec![gateway],
            channels: vec![channel],
            points_by_channel,
        }
    }

    /// The channel the operator is viewing, falling back to the first one.
    pub fn active_channel(&self) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|c| c.key == self.active_channel_key)
            .or_else(|| self.channels.first())
    }

    pub fn active_channel_mut(&mut self) -> Option<&mut Channel> {
        if let Some(pos) = self
            .channels
            .iter()
            .position(|c| c.key == self.active_channel_key)
        {
            return self.channels.get_mut(pos);
        }
        self.channels.first_mut()
    }

    pub fn active_gateway(&self) -> Option<&Gateway> {
        let channel = self.active_channel()?;
        self.gateways.iter().find(|g| g.id == channel.gateway_id)
    }

    pub fn channel(&self, key: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.key == key)
    }

    pub fn channel_mut(&mut self, key: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.key == key)
    }

    /// Points list for a channel key, auto-created with the default rows if
    /// missing — no channel key is ever without a points list.
    pub fn points_mut(&mut self, channel_key: &str) -> &mut Vec<PointRow> {
        self.points_by_channel
            .entry(channel_key.to_owned())
            .or_insert_with(default_rows)
    }

    /// Read-only view of a channel's points (empty if the key is unknown).
    pub fn points(&self, channel_key: &str) -> &[PointRow] {
        self.points_by_channel
            .get(channel_key)
            .map_or(&[], Vec::as_slice)
    }

    pub fn point_mut(&mut self, channel_key: &str, point_id: &str) -> Option<&mut PointRow> {
        self.points_mut(channel_key)
            .iter_mut()
            .find(|p| p.id == point_id)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
