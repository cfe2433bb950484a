//! Event model - one lifecycle fact reported by the external producer
//!
//! Events are built only through validating constructors: a value of type
//! [`Event`] always carries every field its kind requires. Decoding from the
//! wire lives in [`wire`], conversion from producer hook payloads in [`hook`].

pub mod hook;
pub mod wire;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use wire::{decode_line, encode_line, WireMessage};

/// Identity used for tool and task events that name no agent
///
/// The producer's top-level session reports tool calls without an agent id.
pub const MAIN_AGENT_ID: &str = "main";

/// Free-form key/value data carried alongside an event
pub type Payload = BTreeMap<String, Value>;

/// Kind of lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AgentStart,
    AgentWorking,
    AgentStop,
    ToolStart,
    ToolStop,
    ToolError,
    TaskCompleted,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::AgentStart,
        EventKind::AgentWorking,
        EventKind::AgentStop,
        EventKind::ToolStart,
        EventKind::ToolStop,
        EventKind::ToolError,
        EventKind::TaskCompleted,
    ];

    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AgentStart => "agent_start",
            EventKind::AgentWorking => "agent_working",
            EventKind::AgentStop => "agent_stop",
            EventKind::ToolStart => "tool_start",
            EventKind::ToolStop => "tool_stop",
            EventKind::ToolError => "tool_error",
            EventKind::TaskCompleted => "task_completed",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Agent kinds must name their agent explicitly
    pub fn requires_agent_id(&self) -> bool {
        matches!(
            self,
            EventKind::AgentStart | EventKind::AgentWorking | EventKind::AgentStop
        )
    }

    pub fn requires_tool_name(&self) -> bool {
        matches!(
            self,
            EventKind::ToolStart | EventKind::ToolStop | EventKind::ToolError
        )
    }

    /// Kinds that report activity of a specific agent
    pub fn is_agent_activity(&self) -> bool {
        !matches!(self, EventKind::TaskCompleted)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a message was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("message is not valid UTF-8")]
    Utf8,

    #[error("malformed JSON: {0}")]
    Json(String),

    #[error("message has no event kind")]
    MissingKind,

    #[error("unknown event kind {0:?}")]
    UnknownKind(String),

    #[error("{kind} event is missing required field {field}")]
    MissingField { kind: EventKind, field: &'static str },

    #[error("message of {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },
}

/// One validated lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: EventKind,
    agent_id: String,
    timestamp: f64,
    tool_name: Option<String>,
    payload: Payload,
}

impl Event {
    /// Validate and build an event
    ///
    /// Missing agent ids on tool and task events fall back to
    /// [`MAIN_AGENT_ID`]; everything else a kind requires must be present.
    pub fn new(
        kind: EventKind,
        agent_id: Option<String>,
        timestamp: f64,
        tool_name: Option<String>,
        payload: Payload,
    ) -> Result<Self, DecodeError> {
        let agent_id = agent_id.filter(|id| !id.trim().is_empty());
        let agent_id = match agent_id {
            Some(id) => id,
            None if kind.requires_agent_id() => {
                return Err(DecodeError::MissingField {
                    kind,
                    field: "agent_id",
                })
            }
            None => MAIN_AGENT_ID.to_string(),
        };

        let tool_name = tool_name.filter(|name| !name.trim().is_empty());
        if kind.requires_tool_name() && tool_name.is_none() {
            return Err(DecodeError::MissingField {
                kind,
                field: "tool_name",
            });
        }

        let timestamp = if timestamp.is_finite() { timestamp } else { 0.0 };

        Ok(Self {
            kind,
            agent_id,
            timestamp,
            tool_name,
            payload,
        })
    }

    pub fn agent_start(agent_id: &str, timestamp: f64) -> Self {
        Self::infallible(EventKind::AgentStart, agent_id, timestamp, None)
    }

    pub fn agent_working(agent_id: &str, timestamp: f64) -> Self {
        Self::infallible(EventKind::AgentWorking, agent_id, timestamp, None)
    }

    pub fn agent_stop(agent_id: &str, timestamp: f64, error: bool) -> Self {
        Self::infallible(EventKind::AgentStop, agent_id, timestamp, None)
            .with_field("error", Value::Bool(error))
    }

    pub fn tool_start(agent_id: &str, tool_name: &str, timestamp: f64) -> Self {
        Self::infallible(EventKind::ToolStart, agent_id, timestamp, Some(tool_name))
    }

    pub fn tool_stop(agent_id: &str, tool_name: &str, timestamp: f64) -> Self {
        Self::infallible(EventKind::ToolStop, agent_id, timestamp, Some(tool_name))
    }

    pub fn tool_error(agent_id: &str, tool_name: &str, timestamp: f64) -> Self {
        Self::infallible(EventKind::ToolError, agent_id, timestamp, Some(tool_name))
    }

    pub fn task_completed(subject: &str, timestamp: f64) -> Self {
        Self::infallible(EventKind::TaskCompleted, MAIN_AGENT_ID, timestamp, None)
            .with_field("task_subject", Value::String(subject.to_string()))
    }

    // Constructors above always satisfy validation, provided the caller
    // passes non-blank ids and names; blanks fall back to placeholders.
    fn infallible(kind: EventKind, agent_id: &str, timestamp: f64, tool_name: Option<&str>) -> Self {
        let agent_id = if agent_id.trim().is_empty() {
            MAIN_AGENT_ID.to_string()
        } else {
            agent_id.to_string()
        };
        let tool_name = tool_name.map(|name| {
            if name.trim().is_empty() {
                "unknown".to_string()
            } else {
                name.to_string()
            }
        });
        Self {
            kind,
            agent_id,
            timestamp: if timestamp.is_finite() { timestamp } else { 0.0 },
            tool_name,
            payload: Payload::new(),
        }
    }

    /// Attach a payload field
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.payload.insert(key.to_string(), value);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// String payload field, ignoring blanks and non-string values
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn agent_type(&self) -> Option<&str> {
        self.payload_str("agent_type")
    }

    pub fn description(&self) -> Option<&str> {
        self.payload_str("description")
    }

    /// Short description of what a tool call touches
    pub fn summary(&self) -> Option<&str> {
        self.payload_str("tool_input_summary")
            .or_else(|| self.payload_str("file_path"))
            .or_else(|| self.payload_str("description"))
    }

    pub fn task_subject(&self) -> Option<&str> {
        self.payload_str("task_subject")
    }

    /// True for stops the producer flagged as failed
    pub fn is_error(&self) -> bool {
        match self.kind {
            EventKind::ToolError => true,
            EventKind::AgentStop => {
                self.payload.get("error").and_then(Value::as_bool) == Some(true)
                    || self.payload_str("status") == Some("error")
            }
            _ => false,
        }
    }

    /// "Tool: summary" text shown next to an agent
    pub fn tool_label(&self) -> Option<String> {
        let tool = self.tool_name()?;
        Some(match self.summary() {
            Some(summary) => format!("{}: {}", tool, summary),
            None => tool.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire_name(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_wire_name("bogus"), None);
    }

    #[test]
    fn test_agent_kinds_require_agent_id() {
        let err = Event::new(EventKind::AgentStart, None, 1.0, None, Payload::new()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingField {
                kind: EventKind::AgentStart,
                field: "agent_id"
            }
        );

        let err = Event::new(
            EventKind::AgentStop,
            Some("   ".into()),
            1.0,
            None,
            Payload::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "agent_id", .. }));
    }

    #[test]
    fn test_tool_kinds_require_tool_name() {
        let err = Event::new(
            EventKind::ToolStart,
            Some("a1".into()),
            1.0,
            None,
            Payload::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "tool_name", .. }));
    }

    #[test]
    fn test_tool_event_without_agent_defaults_to_main() {
        let ev = Event::new(
            EventKind::ToolStart,
            None,
            1.0,
            Some("Read".into()),
            Payload::new(),
        )
        .unwrap();
        assert_eq!(ev.agent_id(), MAIN_AGENT_ID);
        assert_eq!(ev.tool_name(), Some("Read"));
    }

    #[test]
    fn test_error_stop_detection() {
        assert!(Event::agent_stop("a1", 0.0, true).is_error());
        assert!(!Event::agent_stop("a1", 0.0, false).is_error());

        let by_status = Event::agent_working("a1", 0.0);
        assert!(!by_status.is_error());
        let stop = Event::new(
            EventKind::AgentStop,
            Some("a1".into()),
            0.0,
            None,
            Payload::from([("status".to_string(), Value::from("error"))]),
        )
        .unwrap();
        assert!(stop.is_error());
        assert!(Event::tool_error("a1", "Bash", 0.0).is_error());
    }

    #[test]
    fn test_tool_label_prefers_summary() {
        let ev = Event::tool_start("a1", "Read", 0.0)
            .with_field("tool_input_summary", Value::from("main.rs"));
        assert_eq!(ev.tool_label().as_deref(), Some("Read: main.rs"));

        let bare = Event::tool_start("a1", "Bash", 0.0);
        assert_eq!(bare.tool_label().as_deref(), Some("Bash"));
        assert_eq!(Event::agent_start("a1", 0.0).tool_label(), None);
    }

    #[test]
    fn test_non_finite_timestamp_is_zeroed() {
        let ev = Event::new(
            EventKind::AgentStart,
            Some("a1".into()),
            f64::NAN,
            None,
            Payload::new(),
        )
        .unwrap();
        assert_eq!(ev.timestamp(), 0.0);
    }
}
