//! Wire types for the executor contract.
//!
//! Every call takes a camelCase JSON payload and answers with the
//! `{success, data}` envelope. Shapes are shared between the HTTP bridge
//! and any in-process executor implementation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response envelope used by every executor call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiResult<T> {
    pub success: bool,
    pub data: T,
}

// ── Connection ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub channel_key: String,
    pub host: String,
    pub port: u16,
    pub slave_id: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectData {
    pub channel_key: String,
    pub endpoint: String,
    pub slave_id: u8,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectData {
    pub channel_key: String,
    pub disconnected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollIntervalData {
    pub channel_key: String,
    pub interval_ms: u64,
}

// ── Point I/O ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadPointRequest {
    pub channel_key: String,
    pub slave_id: u8,
    pub function_code: u8,
    pub address: u32,
    pub quantity: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadPointData {
    pub channel_key: String,
    pub slave_id: u8,
    pub function_code: u8,
    pub address: u32,
    pub quantity: u16,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritePointRequest {
    pub channel_key: String,
    pub slave_id: u8,
    pub function_code: u8,
    pub address: u32,
    pub instruction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritePointData {
    pub channel_key: String,
    pub slave_id: u8,
    pub function_code: u8,
    pub address: u32,
    pub quantity: u16,
    pub accepted: bool,
}

// ── Server-side polling ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStartRequest {
    pub channel_key: String,
    pub slave_id: u8,
    pub function_code: u8,
    pub address: u32,
    pub quantity: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStartData {
    pub channel_key: String,
    pub running: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStopData {
    pub channel_key: String,
    pub running: bool,
}

/// Point-in-time status of a channel's server-side poll loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshotData {
    pub channel_key: String,
    pub running: bool,
    pub interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<ReadPointData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

// ── Configuration sync ──────────────────────────────────────────────

/// Durable gateway record as exchanged with the executor's database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub id: String,
    pub name: String,
}

/// Durable channel configuration (volatile session status excluded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
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
}

/// Durable point configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointConfig {
    pub id: String,
    pub name: String,
    pub function_code: u8,
    pub address: u32,
    pub quantity: u16,
    pub instruction: String,
    pub collect_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLoadRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_channel_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLoadData {
    pub gateways: Vec<GatewayConfig>,
    pub channels: Vec<ChannelConfig>,
    pub points_by_channel: BTreeMap<String, Vec<PointConfig>>,
    pub active_channel_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSaveRequest {
    pub mode: String,
    pub active_channel_key: String,
    pub gateways: Vec<GatewayConfig>,
    pub channels: Vec<ChannelConfig>,
    pub points_by_channel: BTreeMap<String, Vec<PointConfig>>,
    pub auto_rename_duplicate_gateway: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSaveData {
    pub mode: String,
    pub saved_gateway_names: Vec<String>,
}

// ── Collection & telemetry ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectPointsRequest {
    pub channel_key: String,
    pub point_ids: Vec<String>,
    pub apply_all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectPointsData {
    pub channel_key: String,
    pub updated_count: u64,
}

/// One sampled value batch entry submitted to the executor's telemetry sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampled_at_millis: Option<i64>,
    pub gateway_name: String,
    pub channel_key: String,
    pub host: String,
    pub port: u16,
    pub slave_id: u8,
    pub point_id: String,
    pub point_name: String,
    pub function_code: u8,
    pub address: u32,
    pub quantity: u16,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryIngestRequest {
    pub samples: Vec<TelemetrySample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryIngestData {
    pub inserted: u64,
}
