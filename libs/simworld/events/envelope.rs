//! Wire envelope codec
//!
//! Every frame on a world channel is a JSON object
//! `{"type": <kind>, "data": <payload>, "timestamp"?: <string>}`.

use super::kind::{EventKind, UnknownEventKind};
use livewire::WsMessage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why an inbound frame was rejected
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("frame is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotObject,

    #[error("frame has no string 'type' field")]
    MissingType,

    #[error(transparent)]
    UnknownType(#[from] UnknownEventKind),

    #[error("field '{0}' has the wrong shape")]
    InvalidField(&'static str),

    #[error("binary frames are not supported")]
    Binary,
}

/// One parsed inbound event
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: EventKind,
    /// Raw payload; `Value::Null` when the frame carried none
    pub data: Value,
    pub timestamp: Option<String>,
}

impl Envelope {
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self {
            kind,
            data,
            timestamp: None,
        }
    }

    /// Synthetic lifecycle envelope with a null payload
    pub fn lifecycle(kind: EventKind) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut object) = value else {
            return Err(EnvelopeError::NotObject);
        };

        let kind: EventKind = match object.get("type") {
            Some(Value::String(kind)) => kind.parse()?,
            _ => return Err(EnvelopeError::MissingType),
        };

        let timestamp = match object.remove("timestamp") {
            None | Some(Value::Null) => None,
            Some(Value::String(ts)) => Some(ts),
            Some(_) => return Err(EnvelopeError::InvalidField("timestamp")),
        };

        let data = match object.remove("data") {
            Some(data) => data,
            // Point broadcasts put the list at the top level
            None if kind == EventKind::PointsUpdate && object.contains_key("points") => {
                let mut data = Map::new();
                if let Some(points) = object.remove("points") {
                    data.insert("points".to_string(), points);
                }
                Value::Object(data)
            }
            None => Value::Null,
        };

        Ok(Self {
            kind,
            data,
            timestamp,
        })
    }

    /// Parse a transport frame
    pub fn from_frame(frame: &WsMessage) -> Result<Self, EnvelopeError> {
        match frame {
            WsMessage::Text(text) => Self::parse(text),
            WsMessage::Binary(_) => Err(EnvelopeError::Binary),
        }
    }

    /// Deserialize the payload into `T`
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Client → server frame
///
/// The type is a free string: besides the event kinds the server accepts
/// commands such as `add_point` and `move_point`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

impl OutgoingMessage {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Build a message whose payload is any serializable value
    pub fn with_payload<T: Serialize>(kind: impl Into<String>, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(kind, serde_json::to_value(payload)?))
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_frame(&self) -> Result<WsMessage, serde_json::Error> {
        self.to_text().map(WsMessage::Text)
    }
}
