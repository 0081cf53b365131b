//! Lenient validation of a raw persisted document.
//!
//! The on-disk file is operator-adjacent data: it may come from an older
//! build, a hand edit, or a partial write that survived. Loading therefore
//! never trusts it — this pass walks the raw `serde_json::Value` once and
//! rebuilds a model that holds every session invariant, dropping what cannot
//! be repaired. Returns `None` only when the document is unusable as a
//! whole; a fresh default session is the caller's fallback either way.
//!
//! Repair rules:
//! - numbers accept integers, floats (rounded) and numeric strings;
//! - intervals, timeouts, retries, ports and slave ids are clamped;
//! - missing gateway ids/names and channel keys are rebuilt from the
//!   entry's position or its `(gateway, slave id)` pair;
//! - duplicate gateway ids / channel keys keep the first occurrence;
//! - channels referencing an unknown gateway are dropped;
//! - an empty gateway list gets the default gateway, an empty channel
//!   list gets a channel for the first surviving gateway;
//! - every surviving channel gets a points list (default rows if absent);
//! - the active key must name a surviving channel, else the first one.

use std::collections::{BTreeMap, BTreeSet};

use modwatch_core::model::{
    self, AUTO_READ_MAX_INTERVAL_MS, AUTO_READ_MIN_INTERVAL_MS, Channel, Gateway, PointRow,
    POLL_INTERVAL_MAX_MS, POLL_INTERVAL_MIN_MS, POLL_READ_RETRY_MAX, POLL_READ_RETRY_MIN,
    POLL_READ_TIMEOUT_MAX_MS, POLL_READ_TIMEOUT_MIN_MS, SLAVE_ID_MAX, SLAVE_ID_MIN,
};
use modwatch_core::SessionState;
use serde_json::Value;

use crate::envelope::PERSIST_VERSION;

/// Rebuild a [`SessionState`] from a raw envelope document.
pub fn sanitize_envelope(raw: &Value) -> Option<SessionState> {
    let envelope = raw.as_object()?;
    if envelope.get("version").and_then(Value::as_u64) != Some(PERSIST_VERSION) {
        return None;
    }
    sanitize_state(envelope.get("state")?)
}

/// Rebuild a [`SessionState`] from the envelope's `state` object.
pub fn sanitize_state(raw: &Value) -> Option<SessionState> {
    let state = raw.as_object()?;

    let empty = Vec::new();

    let mut gateways: Vec<Gateway> = Vec::new();
    let mut seen_gateways = BTreeSet::new();
    for (index, entry) in state
        .get("gateways")
        .and_then(Value::as_array)
        .unwrap_or(&empty)
        .iter()
        .enumerate()
    {
        let gateway = sanitize_gateway(entry, index);
        if seen_gateways.insert(gateway.id.clone()) {
            gateways.push(gateway);
        }
    }
    // The default gateway comes first so channels referencing its id
    // still resolve below.
    if gateways.is_empty() {
        let gateway = model::default_gateway(0);
        seen_gateways.insert(gateway.id.clone());
        gateways.push(gateway);
    }

    let mut channels: Vec<Channel> = Vec::new();
    let mut seen_channels = BTreeSet::new();
    for entry in state
        .get("channels")
        .and_then(Value::as_array)
        .unwrap_or(&empty)
    {
        let Some(channel) = sanitize_channel(entry) else {
            continue;
        };
        if !seen_gateways.contains(&channel.gateway_id) {
            continue;
        }
        if seen_channels.insert(channel.key.clone()) {
            channels.push(channel);
        }
    }
    if channels.is_empty() {
        channels.push(model::channel_from_gateway(&gateways[0], 1));
    }

    let mut points_by_channel: BTreeMap<String, Vec<PointRow>> = BTreeMap::new();
    let raw_points = state.get("pointsByChannel").and_then(Value::as_object);
    for channel in &channels {
        let rows = raw_points
            .and_then(|map| map.get(&channel.key))
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .filter_map(|(index, entry)| sanitize_point(entry, index))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let rows = if rows.is_empty() {
            model::default_rows()
        } else {
            rows
        };
        points_by_channel.insert(channel.key.clone(), rows);
    }

    let active_channel_key = state
        .get("activeChannelKey")
        .and_then(Value::as_str)
        .filter(|key| channels.iter().any(|c| c.key == *key))
        .map_or_else(|| channels[0].key.clone(), str::to_owned);

    Some(SessionState {
        active_channel_key,
        gateways,
        channels,
        points_by_channel,
    })
}

fn sanitize_gateway(raw: &Value, index: usize) -> Gateway {
    let fallback = model::default_gateway(index);
    Gateway {
        id: raw
            .get("id")
            .and_then(non_empty_string)
            .unwrap_or(fallback.id),
        name: raw
            .get("name")
            .and_then(non_empty_string)
            .unwrap_or(fallback.name),
    }
}

fn sanitize_channel(raw: &Value) -> Option<Channel> {
    // A channel without a resolvable gateway has no home; everything else
    // is repairable, including a missing key.
    let gateway_id = raw.get("gatewayId").and_then(non_empty_string)?;

    let slave_id = clamp_u64(
        raw.get("slaveId"),
        1,
        u64::from(SLAVE_ID_MIN),
        u64::from(SLAVE_ID_MAX),
    ) as u8;

    let mut channel = model::channel_from_gateway(
        &Gateway {
            id: gateway_id,
            name: String::new(),
        },
        slave_id,
    );
    if let Some(key) = raw.get("key").and_then(non_empty_string) {
        channel.key = key;
    }
    if let Some(label) = raw.get("label").and_then(non_empty_string) {
        channel.label = label;
    }
    if let Some(station_code) = raw.get("stationCode").and_then(non_empty_string) {
        channel.station_code = station_code;
    }
    if let Some(host) = raw.get("host").and_then(non_empty_string) {
        channel.host = host;
    }
    channel.port = clamp_u64(raw.get("port"), 502, 1, u64::from(u16::MAX)) as u16;
    channel.poll_interval_ms = clamp_u64(
        raw.get("pollIntervalMs"),
        1000,
        POLL_INTERVAL_MIN_MS,
        POLL_INTERVAL_MAX_MS,
    );
    channel.auto_read_enabled = raw
        .get("autoReadEnabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    channel.auto_read_interval_ms = clamp_u64(
        raw.get("autoReadIntervalMs"),
        1000,
        AUTO_READ_MIN_INTERVAL_MS,
        AUTO_READ_MAX_INTERVAL_MS,
    );
    channel.poll_read_timeout_ms = clamp_u64(
        raw.get("pollReadTimeoutMs"),
        5000,
        POLL_READ_TIMEOUT_MIN_MS,
        POLL_READ_TIMEOUT_MAX_MS,
    );
    channel.poll_read_retry_count = clamp_u64(
        raw.get("pollReadRetryCount"),
        3,
        u64::from(POLL_READ_RETRY_MIN),
        u64::from(POLL_READ_RETRY_MAX),
    ) as u32;

    Some(channel)
}

fn sanitize_point(raw: &Value, index: usize) -> Option<PointRow> {
    raw.as_object()?;

    // Id and name fall back to a freshly generated row at this position.
    let mut row = model::point_row(index);
    if let Some(id) = raw.get("id").and_then(non_empty_string) {
        row.id = id;
    }
    if let Some(name) = raw.get("name").and_then(non_empty_string) {
        row.name = name;
    }
    row.function_code = clamp_u64(raw.get("functionCode"), 3, 1, 16) as u8;
    row.address = clamp_u64(raw.get("address"), 0, 0, u64::from(u32::MAX)) as u32;
    row.quantity = clamp_u64(raw.get("quantity"), 1, 1, u64::from(u16::MAX)) as u16;
    if let Some(instruction) = raw.get("instruction").and_then(Value::as_str) {
        row.instruction = instruction.to_owned();
    }
    if let Some(value_text) = raw.get("valueText").and_then(Value::as_str) {
        row.value_text = value_text.to_owned();
    }
    row.collect_enabled = raw
        .get("collectEnabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Some(row)
}

fn non_empty_string(raw: &Value) -> Option<String> {
    let text = raw.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}

/// Integer coercion: integers pass through, floats round, numeric strings
/// parse. Anything else falls back to the default. The result is clamped.
fn to_integer(raw: Option<&Value>, default: u64) -> u64 {
    match raw {
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                v
            } else if let Some(v) = n.as_f64() {
                if v.is_finite() && v >= 0.0 {
                    v.round() as u64
                } else {
                    default
                }
            } else {
                default
            }
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map_or(default, |v| v.round() as u64),
        _ => default,
    }
}

fn clamp_u64(raw: Option<&Value>, default: u64, min: u64, max: u64) -> u64 {
    to_integer(raw, default).clamp(min, max)
}
