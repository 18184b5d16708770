//! Kura protobuf payloads
//!
//! The body is a JSON document in the Kura cloud-payload shape:
//!
//! ```json
//! {
//!   "sentOn": 1700000000000,
//!   "position": {"latitude": 45.0, "longitude": 9.1},
//!   "metrics": {"temp": 21.5, "count": 3, "ok": true, "unit": "C"},
//!   "body": "aGVsbG8="
//! }
//! ```
//!
//! Every field is optional. `body` is base64. It is encoded into the
//! `kuradatatypes.KuraPayload` protobuf message.

use crate::traits::{CodecError, PayloadCodec};
use base64::Engine;
use prost::Message;
use serde::Deserialize;
use serde_json::{Map, Value};

/// `kuradatatypes.KuraPayload`
#[derive(Clone, PartialEq, prost::Message)]
pub struct KuraPayload {
    /// Milliseconds since the epoch
    #[prost(int64, optional, tag = "1")]
    pub timestamp: Option<i64>,
    /// Device position
    #[prost(message, optional, tag = "2")]
    pub position: Option<KuraPosition>,
    /// Named metrics
    #[prost(message, repeated, tag = "5000")]
    pub metric: Vec<KuraMetric>,
    /// Opaque body
    #[prost(bytes = "vec", optional, tag = "5001")]
    pub body: Option<Vec<u8>>,
}

/// `kuradatatypes.KuraPayload.KuraMetric`
#[derive(Clone, PartialEq, prost::Message)]
pub struct KuraMetric {
    /// Metric name
    #[prost(string, required, tag = "1")]
    pub name: String,
    /// Which value field is set
    #[prost(enumeration = "ValueType", required, tag = "2")]
    pub r#type: i32,
    /// Value when `type` is DOUBLE
    #[prost(double, optional, tag = "3")]
    pub double_value: Option<f64>,
    /// Value when `type` is FLOAT
    #[prost(float, optional, tag = "4")]
    pub float_value: Option<f32>,
    /// Value when `type` is INT64
    #[prost(int64, optional, tag = "5")]
    pub long_value: Option<i64>,
    /// Value when `type` is INT32
    #[prost(int32, optional, tag = "6")]
    pub int_value: Option<i32>,
    /// Value when `type` is BOOL
    #[prost(bool, optional, tag = "7")]
    pub bool_value: Option<bool>,
    /// Value when `type` is STRING
    #[prost(string, optional, tag = "8")]
    pub string_value: Option<String>,
    /// Value when `type` is BYTES
    #[prost(bytes = "vec", optional, tag = "9")]
    pub bytes_value: Option<Vec<u8>>,
}

/// `kuradatatypes.KuraPayload.KuraMetric.ValueType`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ValueType {
    /// 64-bit float
    Double = 0,
    /// 32-bit float
    Float = 1,
    /// 64-bit integer
    Int64 = 2,
    /// 32-bit integer
    Int32 = 3,
    /// Boolean
    Bool = 4,
    /// UTF-8 string
    String = 5,
    /// Raw bytes
    Bytes = 6,
}

/// `kuradatatypes.KuraPayload.KuraPosition`
#[derive(Clone, PartialEq, prost::Message)]
pub struct KuraPosition {
    /// Degrees
    #[prost(double, required, tag = "1")]
    pub latitude: f64,
    /// Degrees
    #[prost(double, required, tag = "2")]
    pub longitude: f64,
    /// Meters
    #[prost(double, optional, tag = "3")]
    pub altitude: Option<f64>,
    /// Dilution of precision
    #[prost(double, optional, tag = "4")]
    pub precision: Option<f64>,
    /// Degrees
    #[prost(double, optional, tag = "5")]
    pub heading: Option<f64>,
    /// Meters per second
    #[prost(double, optional, tag = "6")]
    pub speed: Option<f64>,
    /// Milliseconds since the epoch
    #[prost(int64, optional, tag = "7")]
    pub timestamp: Option<i64>,
    /// Satellites in view
    #[prost(int32, optional, tag = "8")]
    pub satellites: Option<i32>,
    /// Fix status
    #[prost(int32, optional, tag = "9")]
    pub status: Option<i32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct PayloadJson {
    sent_on: Option<i64>,
    position: Option<PositionJson>,
    #[serde(default)]
    metrics: Map<String, Value>,
    body: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PositionJson {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
    altitude: Option<f64>,
    precision: Option<f64>,
    heading: Option<f64>,
    speed: Option<f64>,
    timestamp: Option<i64>,
    satellites: Option<i32>,
    status: Option<i32>,
}

impl From<PositionJson> for KuraPosition {
    fn from(p: PositionJson) -> Self {
        Self {
            latitude: p.latitude,
            longitude: p.longitude,
            altitude: p.altitude,
            precision: p.precision,
            heading: p.heading,
            speed: p.speed,
            timestamp: p.timestamp,
            satellites: p.satellites,
            status: p.status,
        }
    }
}

impl KuraMetric {
    fn empty(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            r#type: value_type as i32,
            double_value: None,
            float_value: None,
            long_value: None,
            int_value: None,
            bool_value: None,
            string_value: None,
            bytes_value: None,
        }
    }

    /// Metric for a JSON value; integers become INT64, other numbers DOUBLE
    fn from_json(name: &str, value: &Value) -> Result<Self, CodecError> {
        let metric = match value {
            Value::Bool(b) => Self {
                bool_value: Some(*b),
                ..Self::empty(name, ValueType::Bool)
            },
            Value::String(s) => Self {
                string_value: Some(s.clone()),
                ..Self::empty(name, ValueType::String)
            },
            Value::Number(n) => match n.as_i64() {
                Some(v) => Self {
                    long_value: Some(v),
                    ..Self::empty(name, ValueType::Int64)
                },
                None => Self {
                    double_value: n.as_f64(),
                    ..Self::empty(name, ValueType::Double)
                },
            },
            other => {
                return Err(CodecError::InvalidPayload(format!(
                    "metric {name:?} has unsupported value {other}"
                )))
            }
        };
        Ok(metric)
    }
}

impl KuraPayload {
    /// Build from the JSON form described in the module docs
    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let json: PayloadJson = serde_json::from_str(text)
            .map_err(|e| CodecError::InvalidPayload(format!("not a Kura JSON payload: {e}")))?;

        let metric = json
            .metrics
            .iter()
            .map(|(name, value)| KuraMetric::from_json(name, value))
            .collect::<Result<Vec<_>, _>>()?;

        let body = json
            .body
            .map(|b| {
                base64::engine::general_purpose::STANDARD
                    .decode(b.as_bytes())
                    .map_err(|e| CodecError::InvalidPayload(format!("body is not base64: {e}")))
            })
            .transpose()?;

        Ok(Self {
            timestamp: json.sent_on,
            position: json.position.map(KuraPosition::from),
            metric,
            body,
        })
    }
}

/// Encodes a Kura JSON body as Kura protobuf
#[derive(Debug, Clone, Copy, Default)]
pub struct KuraCodec;

impl PayloadCodec for KuraCodec {
    fn name(&self) -> &str {
        "kura"
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        Ok(KuraPayload::from_json(text)?.encode_to_vec())
    }
}
