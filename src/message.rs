//! Message protocol definitions
//!
//! A `WireMessage` is the unit exchanged with participants and peers:
//! a `dataType` discriminator, an opaque JSON-encoded `data` payload and
//! the target room `code`. For `drawing` messages the payload decodes to
//! a `DrawingOperation`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::types::RoomCode;

/// Message discriminator
///
/// Carried on the wire as a plain string. Kinds other than `drawing` and
/// `test` are relayed untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    /// Canvas operation, broadcast and logged
    Drawing,
    /// Connectivity check, never broadcast nor logged
    Test,
    /// Anything else, broadcast but not logged
    Other(String),
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "drawing" => DataType::Drawing,
            "test" => DataType::Test,
            _ => DataType::Other(value),
        }
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        match value {
            DataType::Drawing => "drawing".to_string(),
            DataType::Test => "test".to_string(),
            DataType::Other(other) => other,
        }
    }
}

/// Participant / peer message
///
/// The capitalized key aliases match what browser clients send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "dataType", alias = "DataType")]
    pub data_type: DataType,
    /// JSON-encoded payload
    #[serde(alias = "Data", default)]
    pub data: String,
    /// Target room code
    #[serde(alias = "Code", default)]
    pub code: String,
    /// Number of peer forwards this message has already gone through
    #[serde(default, skip_serializing_if = "is_zero")]
    pub hops: u8,
    /// Fields this relay does not interpret, forwarded to peers untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_zero(hops: &u8) -> bool {
    *hops == 0
}

impl WireMessage {
    pub fn new(data_type: DataType, data: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            data_type,
            data: data.into(),
            code: code.into(),
            hops: 0,
            extra: Map::new(),
        }
    }

    /// Build a `drawing` message carrying an encoded operation
    pub fn drawing(code: &RoomCode, op: &DrawingOperation) -> Result<Self, AppError> {
        Ok(Self::new(
            DataType::Drawing,
            serde_json::to_string(op)?,
            code.as_str(),
        ))
    }

    /// Decode a message from a text frame or request body
    pub fn decode(raw: &[u8]) -> Result<Self, AppError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Encode for delivery to participants
    ///
    /// Participants get the three protocol fields only; the hop counter
    /// and uninterpreted fields stay within the peer pool.
    pub fn encode_for_clients(&self) -> Result<String, AppError> {
        let outbound = WireMessage::new(
            self.data_type.clone(),
            self.data.as_str(),
            self.code.as_str(),
        );
        Ok(serde_json::to_string(&outbound)?)
    }

    /// Copy of this message as it should leave for the peer pool
    ///
    /// Everything that was received is kept; only `hops` is bumped.
    pub fn next_hop(&self) -> Self {
        WireMessage {
            hops: self.hops.saturating_add(1),
            ..self.clone()
        }
    }

    pub fn is_test(&self) -> bool {
        self.data_type == DataType::Test
    }

    pub fn is_drawing(&self) -> bool {
        self.data_type == DataType::Drawing
    }

    pub fn room_code(&self) -> RoomCode {
        RoomCode::new(self.code.as_str())
    }

    /// Decode the payload of a `drawing` message
    pub fn drawing_operation(&self) -> Result<DrawingOperation, AppError> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

/// Kind of canvas operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Free-hand stroke
    #[serde(alias = "freehand")]
    Stroke,
    Line,
    #[serde(alias = "rectangle")]
    Rect,
    Circle,
    Text,
}

/// Decoded `drawing` payload
///
/// Optional attributes stay absent rather than zero when not applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingOperation {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}
