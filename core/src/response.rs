//! Sample outcome and timing structures

use crate::request::SampleRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Categorical result of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    /// Message published
    Ok,
    /// No usable connection could be established
    ConnectFailed,
    /// Connection was usable but the publish failed
    PublishFailed,
}

impl ResponseCode {
    /// Wire/report representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::Ok => "OK",
            ResponseCode::ConnectFailed => "CONNECT_FAILED",
            ResponseCode::PublishFailed => "PUBLISH_FAILED",
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sample timing information
///
/// Timestamps are wall-clock; the millisecond figures come from a monotonic
/// clock and are what reports aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleTiming {
    /// When the sample started
    pub started_at: DateTime<Utc>,

    /// When the connect phase ended (hit, new session, or failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_end: Option<DateTime<Utc>>,

    /// When the sample finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Time spent obtaining a connection
    pub connect_ms: f64,

    /// Time spent encoding and publishing
    pub publish_ms: f64,

    /// End-to-end sample latency
    pub latency_ms: f64,
}

impl SampleTiming {
    /// Timing for a sample starting now
    pub fn start(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            connect_end: None,
            finished_at: None,
            connect_ms: 0.0,
            publish_ms: 0.0,
            latency_ms: 0.0,
        }
    }

    /// Mark the end of the connect phase
    pub fn connect_ended(&mut self, at: DateTime<Utc>, elapsed: Duration) {
        self.connect_end = Some(at);
        self.connect_ms = as_ms(elapsed);
    }

    /// Mark the end of the sample
    pub fn finished(&mut self, at: DateTime<Utc>, elapsed: Duration) {
        self.finished_at = Some(at);
        self.latency_ms = as_ms(elapsed);
        self.publish_ms = (self.latency_ms - self.connect_ms).max(0.0);
    }
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Result of one sample execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleOutcome {
    /// Whether the message was published
    pub success: bool,

    /// Categorical result
    pub response_code: ResponseCode,

    /// Confirmation or error detail
    pub message: String,

    /// Timing
    pub timing: SampleTiming,

    /// Sample label (`tcp://host:port`)
    pub label: String,

    /// Echo of the connection settings
    pub sampler_data: String,

    /// Topic the sample published to
    pub topic: String,

    /// Size of the encoded payload (0 when never encoded)
    pub payload_bytes: usize,
}

impl SampleOutcome {
    /// Pending outcome for `request`; starts out as a publish failure
    pub fn begin(request: &SampleRequest, close_default: bool, started_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            response_code: ResponseCode::PublishFailed,
            message: String::new(),
            timing: SampleTiming::start(started_at),
            label: request.label(),
            sampler_data: request.sampler_data(close_default),
            topic: request.topic.clone(),
            payload_bytes: 0,
        }
    }

    /// Record a failure
    pub fn fail(&mut self, code: ResponseCode, message: impl Into<String>) {
        self.success = false;
        self.response_code = code;
        self.message = message.into();
    }

    /// Record a successful publish
    pub fn succeed(&mut self, payload_bytes: usize, message: impl Into<String>) {
        self.success = true;
        self.response_code = ResponseCode::Ok;
        self.payload_bytes = payload_bytes;
        self.message = message.into();
    }

    /// Check if the sample failed
    pub fn is_error(&self) -> bool {
        !self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> SampleOutcome {
        let request = SampleRequest::new("broker.local", "t/1").with_client_id("c1");
        SampleOutcome::begin(&request, false, Utc::now())
    }

    #[test]
    fn test_response_code_serialization() {
        assert_eq!(
            serde_json::to_string(&ResponseCode::ConnectFailed).unwrap(),
            "\"CONNECT_FAILED\""
        );
        assert_eq!(serde_json::to_string(&ResponseCode::Ok).unwrap(), "\"OK\"");
        assert_eq!(ResponseCode::PublishFailed.to_string(), "PUBLISH_FAILED");
    }

    #[test]
    fn test_begin_echoes_request() {
        let outcome = outcome();
        assert!(outcome.is_error());
        assert_eq!(outcome.label, "tcp://broker.local:1883");
        assert_eq!(outcome.topic, "t/1");
        assert!(outcome.sampler_data.contains("Reuse: true"));
    }

    #[test]
    fn test_succeed_and_fail() {
        let mut outcome = outcome();
        outcome.succeed(12, "sent");
        assert!(outcome.success);
        assert_eq!(outcome.response_code, ResponseCode::Ok);
        assert_eq!(outcome.payload_bytes, 12);

        outcome.fail(ResponseCode::ConnectFailed, "refused");
        assert!(!outcome.success);
        assert_eq!(outcome.message, "refused");
    }

    #[test]
    fn test_timing_phases() {
        let mut timing = SampleTiming::start(Utc::now());
        timing.connect_ended(Utc::now(), Duration::from_millis(30));
        timing.finished(Utc::now(), Duration::from_millis(50));

        assert!((timing.connect_ms - 30.0).abs() < 0.01);
        assert!((timing.publish_ms - 20.0).abs() < 0.01);
        assert!((timing.latency_ms - 50.0).abs() < 0.01);
        assert!(timing.connect_end.is_some());
        assert!(timing.finished_at.is_some());
    }

    #[test]
    fn test_timing_skips_unset_timestamps() {
        let timing = SampleTiming::start(Utc::now());
        let json = serde_json::to_string(&timing).unwrap();
        assert!(!json.contains("connect_end"));
        assert!(!json.contains("finished_at"));
        assert!(json.contains("started_at"));
    }
}
