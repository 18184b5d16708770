//! Payload codecs

mod kura;

pub use kura::{KuraCodec, KuraMetric, KuraPayload, KuraPosition, ValueType};

use crate::traits::{CodecError, PayloadCodec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sends the body as its UTF-8 bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl PayloadCodec for TextCodec {
    fn name(&self) -> &str {
        "text"
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        Ok(text.as_bytes().to_vec())
    }
}

/// Requires a JSON body and sends it in compact form
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CodecError::InvalidPayload(e.to_string()))?;
        serde_json::to_vec(&value).map_err(|e| CodecError::InvalidPayload(e.to_string()))
    }
}

/// Codec selection for configuration files and the CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// [`TextCodec`]
    #[default]
    Text,
    /// [`JsonCodec`]
    Json,
    /// [`KuraCodec`]
    Kura,
}

impl CodecKind {
    /// Instantiate the codec
    pub fn build(self) -> Arc<dyn PayloadCodec> {
        match self {
            CodecKind::Text => Arc::new(TextCodec),
            CodecKind::Json => Arc::new(JsonCodec),
            CodecKind::Kura => Arc::new(KuraCodec),
        }
    }
}

impl std::str::FromStr for CodecKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(CodecKind::Text),
            "json" => Ok(CodecKind::Json),
            "kura" => Ok(CodecKind::Kura),
            other => Err(CodecError::InvalidPayload(format!(
                "unknown codec: {other}"
            ))),
        }
    }
}
