use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::hub::EventEnvelope;

/// Shapes a client may use for an inbound event.
///
/// - `["quiz_elapsed", {"elapsed": 42}]`, as socket-style clients emit
/// - `{"event": "quiz_elapsed", "data": {"elapsed": 42}}`
///
/// Outbound frames always use the object form. Arrays other than the
/// two-element tuple are rejected, `["quiz_elapsed"]` included.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Tuple(String, Value),
    #[serde(deserialize_with = "object_only")]
    Object(EventEnvelope),
}

// A derived struct impl also accepts a sequence of its fields.
fn object_only<'de, D>(deserializer: D) -> Result<EventEnvelope, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Map::<String, Value>::deserialize(deserializer)?;
    serde_json::from_value(Value::Object(map)).map_err(D::Error::custom)
}

impl InboundFrame {
    pub fn decode(text: &str) -> Result<EventEnvelope, serde_json::Error> {
        serde_json::from_str::<InboundFrame>(text).map(EventEnvelope::from)
    }
}

impl From<InboundFrame> for EventEnvelope {
    fn from(frame: InboundFrame) -> Self {
        match frame {
            InboundFrame::Tuple(event, data) => EventEnvelope { event, data },
            InboundFrame::Object(envelope) => envelope,
        }
    }
}
