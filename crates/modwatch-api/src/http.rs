// HTTP bridge client for the remote executor.
//
// Wraps `reqwest::Client` with executor-specific URL construction and
// `{success, data}` envelope unwrapping. Every contract call is a POST of a
// camelCase JSON payload to `{base}/api/modbus/{op}`.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::executor::ModbusExecutor;
use crate::transport::TransportConfig;
use crate::types::*;

/// HTTP implementation of the executor contract.
///
/// The envelope is stripped before the caller sees it: rejected calls
/// (`success: false` or a non-2xx status) surface as [`Error::Executor`]
/// carrying the bridge's human-readable message.
pub struct HttpExecutor {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpExecutor {
    /// Create a new client for the bridge at `base_url`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client` (used by tests).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    /// The bridge base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the URL for one contract operation.
    fn op_url(&self, op: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("api/modbus/{op}"))?)
    }

    /// POST a payload and unwrap the `{success, data}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        op: &str,
        payload: &impl Serialize,
    ) -> Result<T, Error> {
        let url = self.op_url(op)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Executor {
                message: extract_message(&body)
                    .unwrap_or_else(|| format!("executor call {op} failed (HTTP {status})")),
            });
        }

        let envelope: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        if envelope.get("success").and_then(serde_json::Value::as_bool) != Some(true) {
            return Err(Error::Executor {
                message: extract_message(&body)
                    .unwrap_or_else(|| format!("executor rejected call {op}")),
            });
        }

        let data = envelope
            .get("data")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

/// Pull a human-readable message out of an error body, if there is one.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["message", "error"] {
        if let Some(msg) = value.get(key).and_then(serde_json::Value::as_str) {
            return Some(msg.to_owned());
        }
    }
    value
        .get("data")
        .and_then(|d| d.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelKeyPayload<'a> {
    channel_key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PollIntervalPayload<'a> {
    channel_key: &'a str,
    interval_ms: u64,
}

#[async_trait]
impl ModbusExecutor for HttpExecutor {
    async fn connect(&self, req: ConnectRequest) -> Result<ConnectData, Error> {
        self.call("connect", &req).await
    }

    async fn disconnect(&self, channel_key: &str) -> Result<DisconnectData, Error> {
        self.call("disconnect", &ChannelKeyPayload { channel_key })
            .await
    }

    async fn set_poll_interval(
        &self,
        channel_key: &str,
        interval_ms: u64,
    ) -> Result<PollIntervalData, Error> {
        self.call(
            "set_poll_interval",
            &PollIntervalPayload {
                channel_key,
                interval_ms,
            },
        )
        .await
    }

    async fn read_point(&self, req: ReadPointRequest) -> Result<ReadPointData, Error> {
        self.call("read_point", &req).await
    }

    async fn write_point(&self, req: WritePointRequest) -> Result<WritePointData, Error> {
        self.call("write_point", &req).await
    }

    async fn poll_start(&self, req: PollStartRequest) -> Result<PollStartData, Error> {
        self.call("poll_start", &req).await
    }

    async fn poll_stop(&self, channel_key: &str) -> Result<PollStopData, Error> {
        self.call("poll_stop", &ChannelKeyPayload { channel_key })
            .await
    }

    async fn poll_snapshot(&self, channel_key: &str) -> Result<PollSnapshotData, Error> {
        self.call("poll_snapshot", &ChannelKeyPayload { channel_key })
            .await
    }

    async fn config_load(&self, req: ConfigLoadRequest) -> Result<ConfigLoadData, Error> {
        self.call("config_load", &req).await
    }

    async fn config_save(&self, req: ConfigSaveRequest) -> Result<ConfigSaveData, Error> {
        self.call("config_save", &req).await
    }

    async fn collect_points_set(
        &self,
        req: CollectPointsRequest,
    ) -> Result<CollectPointsData, Error> {
        self.call("collect_points_set", &req).await
    }

    async fn telemetry_ingest(
        &self,
        req: TelemetryIngestRequest,
    ) -> Result<TelemetryIngestData, Error> {
        self.call("telemetry_ingest", &req).await
    }
}
