//! Conversions between the session model and the executor's durable
//! config shapes. Wire → model conversions always reset volatile status.

use modwatch_api::types::{ChannelConfig, GatewayConfig, PointConfig};

use crate::model::{Channel, Gateway, PointRow};

pub fn gateway_to_config(gateway: &Gateway) -> GatewayConfig {
    GatewayConfig {
        id: gateway.id.clone(),
        name: gateway.name.clone(),
    }
}

pub fn gateway_from_config(config: GatewayConfig) -> Gateway {
    Gateway {
        id: config.id,
        name: config.name,
    }
}

pub fn channel_to_config(channel: &Channel) -> ChannelConfig {
    ChannelConfig {
        key: channel.key.clone(),
        label: channel.label.clone(),
        gateway_id: channel.gateway_id.clone(),
        station_code: channel.station_code.clone(),
        host: channel.host.clone(),
        port: channel.port,
        slave_id: channel.slave_id,
        poll_interval_ms: channel.poll_interval_ms,
        auto_read_enabled: channel.auto_read_enabled,
        auto_read_interval_ms: channel.auto_read_interval_ms,
        poll_read_timeout_ms: channel.poll_read_timeout_ms,
        poll_read_retry_count: channel.poll_read_retry_count,
    }
}

pub fn channel_from_config(config: ChannelConfig) -> Channel {
    Channel {
        key: config.key,
        label: config.label,
        gateway_id: config.gateway_id,
        station_code: config.station_code,
        host: config.host,
        port: config.port,
        slave_id: config.slave_id,
        poll_interval_ms: config.poll_interval_ms,
        auto_read_enabled: config.auto_read_enabled,
        auto_read_interval_ms: config.auto_read_interval_ms,
        poll_read_timeout_ms: config.poll_read_timeout_ms,
        poll_read_retry_count: config.poll_read_retry_count,
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

pub fn point_to_config(point: &PointRow) -> PointConfig {
    PointConfig {
        id: point.id.clone(),
        name: point.name.clone(),
        function_code: point.function_code,
        address: point.address,
        quantity: point.quantity,
        instruction: point.instruction.clone(),
        collect_enabled: point.collect_enabled,
    }
}

pub fn point_from_config(config: PointConfig) -> PointRow {
    PointRow {
        id: config.id,
        name: config.name,
        function_code: config.function_code,
        address: config.address,
        quantity: config.quantity,
        instruction: config.instruction,
        value_text: "--".into(),
        collect_enabled: config.collect_enabled,
        last_error: String::new(),
        updated_at: None,
    }
}
