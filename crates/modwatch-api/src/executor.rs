//! The executor port consumed by `modwatch-core`.

use async_trait::async_trait;

use crate::error::Error;
use crate::types::*;

/// Remote Modbus command executor.
///
/// One method per contract call. Implementations perform the actual Modbus
/// I/O (or bridge to a process that does); the orchestrator never sees
/// anything below this trait. All methods resolve to the unwrapped `data`
/// payload — the `{success, data}` envelope is the implementation's problem.
#[async_trait]
pub trait ModbusExecutor: Send + Sync {
    async fn connect(&self, req: ConnectRequest) -> Result<ConnectData, Error>;

    async fn disconnect(&self, channel_key: &str) -> Result<DisconnectData, Error>;

    async fn set_poll_interval(
        &self,
        channel_key: &str,
        interval_ms: u64,
    ) -> Result<PollIntervalData, Error>;

    async fn read_point(&self, req: ReadPointRequest) -> Result<ReadPointData, Error>;

    async fn write_point(&self, req: WritePointRequest) -> Result<WritePointData, Error>;

    async fn poll_start(&self, req: PollStartRequest) -> Result<PollStartData, Error>;

    async fn poll_stop(&self, channel_key: &str) -> Result<PollStopData, Error>;

    async fn poll_snapshot(&self, channel_key: &str) -> Result<PollSnapshotData, Error>;

    async fn config_load(&self, req: ConfigLoadRequest) -> Result<ConfigLoadData, Error>;

    async fn config_save(&self, req: ConfigSaveRequest) -> Result<ConfigSaveData, Error>;

    async fn collect_points_set(
        &self,
        req: CollectPointsRequest,
    ) -> Result<CollectPointsData, Error>;

    async fn telemetry_ingest(
        &self,
        req: TelemetryIngestRequest,
    ) -> Result<TelemetryIngestData, Error>;
}
