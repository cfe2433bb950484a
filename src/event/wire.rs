//! Newline-delimited JSON wire format
//!
//! One object per line:
//!
//! ```json
//! {"event":"tool_start","agent_id":"a1","timestamp":1700000000.5,"tool_name":"Read","tool_input_summary":"main.rs"}
//! ```
//!
//! `event`, `agent_id`, `timestamp` and `tool_name` are structural; every
//! other field is kept verbatim as payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DecodeError, Event, EventKind, Payload};

/// Legacy kind name some producers still send for tool completion
const LEGACY_TOOL_END: &str = "tool_end";

/// Raw message shape before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl WireMessage {
    /// Validate into an [`Event`]
    ///
    /// `received_at` stands in for a missing producer timestamp.
    pub fn into_event(self, received_at: f64) -> Result<Event, DecodeError> {
        let name = self
            .event
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(DecodeError::MissingKind)?;

        let kind = match EventKind::from_wire_name(name) {
            Some(kind) => kind,
            None if name == LEGACY_TOOL_END => {
                let failed = self.payload.get("success").and_then(Value::as_bool) == Some(false);
                if failed {
                    EventKind::ToolError
                } else {
                    EventKind::ToolStop
                }
            }
            None => return Err(DecodeError::UnknownKind(name.to_string())),
        };

        Event::new(
            kind,
            self.agent_id,
            self.timestamp.unwrap_or(received_at),
            self.tool_name,
            self.payload,
        )
    }
}

impl From<&Event> for WireMessage {
    fn from(event: &Event) -> Self {
        Self {
            event: Some(event.kind().as_str().to_string()),
            agent_id: Some(event.agent_id().to_string()),
            timestamp: Some(event.timestamp()),
            tool_name: event.tool_name().map(str::to_string),
            payload: event.payload().clone(),
        }
    }
}

/// Decode one line (without its trailing newline) into an event
pub fn decode_line(line: &[u8], max_len: usize, received_at: f64) -> Result<Event, DecodeError> {
    if line.len() > max_len {
        return Err(DecodeError::TooLarge {
            len: line.len(),
            max: max_len,
        });
    }
    let text = std::str::from_utf8(line).map_err(|_| DecodeError::Utf8)?;
    let message: WireMessage =
        serde_json::from_str(text.trim()).map_err(|e| DecodeError::Json(e.to_string()))?;
    message.into_event(received_at)
}

/// Encode an event as one wire line, newline included
pub fn encode_line(event: &Event) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(&WireMessage::from(event))?;
    line.push('\n');
    Ok(line)
}
