//! Remote Modbus command-executor contract.
//!
//! The executor is the external process that actually speaks Modbus TCP.
//! This crate defines the request/response shapes it accepts, the
//! [`ModbusExecutor`] port consumed by `modwatch-core`, and an HTTP bridge
//! implementation ([`HttpExecutor`]) for executors reachable over REST.

pub mod error;
pub mod executor;
pub mod http;
pub mod transport;
pub mod types;

pub use error::Error;
pub use executor::ModbusExecutor;
pub use http::HttpExecutor;
pub use transport::{TlsMode, TransportConfig};
