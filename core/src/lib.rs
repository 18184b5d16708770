//! mqtt-bench-core: Core of an MQTT publish load generator
//!
//! This crate provides the pieces every mqtt-bench component builds on:
//!
//! - Sample requests, connection keys and sample outcomes
//! - The per-worker connection cache and sample executor
//! - In-flight publish interruption and worker lifecycle handling
//! - Collaborator traits (Connector, BrokerConnection, PayloadCodec)
//! - Worker run loop, orchestrator and metrics aggregation
//!
//! The broker transport itself lives behind [`Connector`]; this crate never
//! opens a socket.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod metrics;
pub mod orchestrator;
pub mod request;
pub mod response;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod testing;

pub use cache::{CacheStats, ConnectionCache};
pub use channel::ChannelConfig;
pub use codec::{CodecKind, JsonCodec, KuraCodec, TextCodec};
pub use config::{ConfigError, ExperimentConfig};
pub use error::*;
pub use key::ConnectionKey;
pub use metrics::*;
pub use orchestrator::{aggregate_worker_stats, AggregatedStats, Orchestrator, OrchestratorBuilder};
pub use request::*;
pub use response::*;
pub use traits::*;
pub use worker::{
    InterruptHandle, PublishRateLimiter, SampleExecutor, Worker, WorkerBuilder, WorkerLifecycle,
    WorkerStats,
};

#[cfg(test)]
mod integration_tests {
    use super::*;

    // =========================================================================
    // Report JSON format tests
    // =========================================================================

    #[test]
    fn test_response_code_json_format() {
        assert_eq!(serde_json::to_string(&ResponseCode::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&ResponseCode::ConnectFailed).unwrap(),
            "\"CONNECT_FAILED\""
        );
        assert_eq!(
            serde_json::to_string(&ResponseCode::PublishFailed).unwrap(),
            "\"PUBLISH_FAILED\""
        );
    }

    #[test]
    fn test_qos_serializes_as_level() {
        assert_eq!(serde_json::to_string(&QoS::ExactlyOnce).unwrap(), "2");
        assert!(serde_json::from_str::<QoS>("3").is_err());
    }

    #[test]
    fn test_request_from_minimal_json() {
        let request: SampleRequest = serde_json::from_str(
            r#"{"server": "broker.local", "client_id": "c1", "topic": "t/1"}"#,
        )
        .unwrap();

        assert_eq!(request.port, DEFAULT_PORT);
        assert!(request.reuse_connection);
        assert_eq!(request.close_connection, CloseConnection::Unset);
        assert_eq!(request.qos, QoS::AtMostOnce);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_sample_record_json_format() {
        let request = SampleRequest::new("broker.local", "t/1").with_client_id("c1");
        let mut outcome = SampleOutcome::begin(&request, false, chrono::Utc::now());
        outcome.fail(ResponseCode::ConnectFailed, "connection refused");
        let record = SampleRecord {
            worker_id: 2,
            sequence: 9,
            outcome,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["worker_id"], 2);
        assert_eq!(json["outcome"]["response_code"], "CONNECT_FAILED");
        assert_eq!(json["outcome"]["label"], "tcp://broker.local:1883");
        assert!(json["outcome"]["timing"].get("finished_at").is_none());
    }

    // =========================================================================
    // Cross-module behavior
    // =========================================================================

    #[test]
    fn test_key_matches_per_worker_request() {
        let template = SampleRequest::new("broker.local", "t/1").with_client_id("bench-{worker}");

        let a = ConnectionKey::of(&template.for_worker(0));
        let b = ConnectionKey::of(&template.for_worker(1));
        let a_again = ConnectionKey::of(&template.for_worker(0));

        assert_ne!(a, b);
        assert_eq!(a, a_again);
    }

    #[test]
    fn test_sampler_data_never_contains_password() {
        let request = SampleRequest::new("broker.local", "t/1")
            .with_client_id("c1")
            .with_credentials("user", "s3cret");

        let outcome = SampleOutcome::begin(&request, false, chrono::Utc::now());
        assert!(!outcome.sampler_data.contains("s3cret"));
        assert!(!format!("{:?}", ConnectionKey::of(&request)).contains("s3cret"));
        assert!(!format!("{:?}", request).contains("s3cret"));
    }
}
