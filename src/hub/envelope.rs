use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named event with an opaque payload, the unit of relay.
///
/// On the wire an envelope is a JSON text frame:
///
/// ```json
/// {"event": "mentor_elapsed", "data": {"elapsed": 42}}
/// ```
///
/// The relay never inspects `data`; whatever arrived is what goes out.
/// A missing `data` field reads as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl EventEnvelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses the object form only. The transport accepts a wider set of
    /// inbound shapes, see `transport::message::InboundFrame`.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
