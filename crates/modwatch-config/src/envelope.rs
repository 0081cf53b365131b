//! Versioned on-disk envelope for the persisted session.
//!
//! Only durable configuration is written: the envelope reuses the executor's
//! gateway and channel config shapes, so volatile session status (connection
//! flags, live errors, alarm counters) is stripped structurally rather than
//! field by field. Points get their own shape because the last displayed
//! value survives restarts, which the executor contract does not carry.

use std::collections::BTreeMap;

use modwatch_api::types::{ChannelConfig, GatewayConfig};
use modwatch_core::convert;
use modwatch_core::model::PointRow;
use modwatch_core::SessionState;
use serde::{Deserialize, Serialize};

pub const PERSIST_VERSION: u64 = 1;

/// Durable point row as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPoint {
    pub id: String,
    pub name: String,
    pub function_code: u8,
    pub address: u32,
    pub quantity: u16,
    pub instruction: String,
    pub value_text: String,
    pub collect_enabled: bool,
}

impl PersistedPoint {
    fn from_row(row: &PointRow) -> Self {
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            function_code: row.function_code,
            address: row.address,
            quantity: row.quantity,
            instruction: row.instruction.clone(),
            value_text: row.value_text.clone(),
            collect_enabled: row.collect_enabled,
        }
    }
}

/// Durable portion of the session model, camelCase on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub active_channel_key: String,
    pub gateways: Vec<GatewayConfig>,
    pub channels: Vec<ChannelConfig>,
    pub points_by_channel: BTreeMap<String, Vec<PersistedPoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEnvelope {
    pub version: u64,
    pub state: PersistedState,
}

impl PersistedEnvelope {
    pub fn from_session(state: &SessionState) -> Self {
        // The save side re-anchors the document on the channel list: points
        // lists for unknown keys are not written, and an active key that no
        // longer resolves falls back to the first channel.
        let active_channel_key = if state
            .channels
            .iter()
            .any(|c| c.key == state.active_channel_key)
        {
            state.active_channel_key.clone()
        } else {
            state
                .channels
                .first()
                .map(|c| c.key.clone())
                .unwrap_or_default()
        };
        Self {
            version: PERSIST_VERSION,
            state: PersistedState {
                active_channel_key,
                gateways: state
                    .gateways
                    .iter()
                    .map(convert::gateway_to_config)
                    .collect(),
                channels: state
                    .channels
                    .iter()
                    .map(convert::channel_to_config)
                    .collect(),
                points_by_channel: state
                    .channels
                    .iter()
                    .map(|channel| {
                        (
                            channel.key.clone(),
                            state
                                .points(&channel.key)
                                .iter()
                                .map(PersistedPoint::from_row)
                                .collect(),
                        )
                    })
                    .collect(),
            },
        }
    }
}
