//! The untyped wire envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while decoding a frame.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Not JSON, not an object, or no string `type`.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The envelope was fine but `data` did not match the declared type.
    #[error("invalid {frame_type} payload: {reason}")]
    InvalidPayload {
        /// Declared frame type.
        frame_type: String,
        /// Decoder message.
        reason: String,
    },
}

/// A frame as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Declared frame type.
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Optional payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Build an envelope with a payload.
    pub fn new(frame_type: impl Into<String>, data: Value) -> Self {
        Self {
            frame_type: frame_type.into(),
            data: Some(data),
        }
    }

    /// Build an envelope with no payload.
    pub fn bare(frame_type: impl Into<String>) -> Self {
        Self {
            frame_type: frame_type.into(),
            data: None,
        }
    }

    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> String {
        // Envelope holds only strings and JSON values, which always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// The payload as an object, treating a missing or `null` payload as empty.
    pub fn data_object(&self) -> Result<Map<String, Value>, FrameError> {
        match &self.data {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(self.invalid(format!("expected object, got {}", kind_of(other)))),
        }
    }

    /// Decode `data` into a typed payload. A missing or `null` payload
    /// decodes as an empty object.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, FrameError> {
        let data = match &self.data {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(other) => other.clone(),
        };
        serde_json::from_value(data).map_err(|e| self.invalid(e.to_string()))
    }

    fn invalid(&self, reason: String) -> FrameError {
        FrameError::InvalidPayload {
            frame_type: self.frame_type.clone(),
            reason,
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
