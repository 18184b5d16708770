//! mqtt-bench-broker: rumqttc-backed broker sessions
//!
//! Implements the [`Connector`](mqtt_bench_core::Connector) and
//! [`BrokerConnection`](mqtt_bench_core::BrokerConnection) capabilities the
//! core drives. Each session owns a rumqttc event loop running on its own
//! tokio task; closing a session cancels that task and fails any publish
//! still waiting on it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod options;

pub use connection::{RumqttConnection, RumqttConnector};
pub use options::{BrokerOptions, OptionsError};
