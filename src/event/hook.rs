//! Conversion from producer hook payloads into events
//!
//! The producer invokes a hook command with a JSON object on stdin. Only the
//! hook names below become events; anything else is ignored.

use std::path::Path;

use serde_json::Value;

use super::{Event, EventKind, Payload};

fn field<'a>(hook: &'a Value, key: &str) -> Option<&'a str> {
    hook.get(key).and_then(Value::as_str)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Short human-readable summary of a tool call's input
pub fn summarize_tool_input(tool_name: &str, input: &Value) -> String {
    let get = |key: &str| input.get(key).and_then(Value::as_str).unwrap_or("");
    match tool_name {
        "Bash" => truncate(get("command"), 40),
        "Read" | "Write" | "Edit" => Path::new(get("file_path"))
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        "Grep" | "Glob" => truncate(get("pattern"), 30),
        "WebSearch" => truncate(get("query"), 30),
        "WebFetch" => truncate(get("url"), 40),
        "Task" => truncate(get("description"), 30),
        name if name.starts_with("mcp__") => {
            let parts: Vec<&str> = name.split("__").collect();
            if parts.len() >= 3 {
                truncate(&format!("{}:{}", parts[1], parts[2]), 30)
            } else {
                truncate(&name["mcp__".len()..], 30)
            }
        }
        _ => String::new(),
    }
}

/// Build an event from one hook invocation
///
/// Returns `None` for hooks that do not map to an event or that lack the
/// fields their event requires.
pub fn event_from_hook(hook: &Value, now: f64) -> Option<Event> {
    let name = field(hook, "hook_event_name")?;
    let agent_id = field(hook, "agent_id").map(str::to_string);
    let mut payload = Payload::new();
    let mut copy = |payload: &mut Payload, key: &str| {
        if let Some(value) = hook.get(key) {
            payload.insert(key.to_string(), value.clone());
        }
    };

    let (kind, tool_name) = match name {
        "SubagentStart" => {
            copy(&mut payload, "agent_type");
            copy(&mut payload, "description");
            (EventKind::AgentStart, None)
        }
        "SubagentStop" => {
            copy(&mut payload, "agent_type");
            let error = hook.get("error").and_then(Value::as_bool).unwrap_or(false);
            payload.insert("error".into(), Value::Bool(error));
            (EventKind::AgentStop, None)
        }
        "PreToolUse" => {
            let tool = field(hook, "tool_name").unwrap_or_default().to_string();
            let input = hook.get("tool_input").cloned().unwrap_or(Value::Null);
            let summary = summarize_tool_input(&tool, &input);
            if !summary.is_empty() {
                payload.insert("tool_input_summary".into(), Value::String(summary));
            }
            (EventKind::ToolStart, Some(tool))
        }
        "PostToolUse" => (
            EventKind::ToolStop,
            field(hook, "tool_name").map(str::to_string),
        ),
        "PostToolUseFailure" => (
            EventKind::ToolError,
            field(hook, "tool_name").map(str::to_string),
        ),
        "TaskCompleted" => {
            copy(&mut payload, "task_subject");
            (EventKind::TaskCompleted, None)
        }
        _ => return None,
    };

    Event::new(kind, agent_id, now, tool_name, payload).ok()
}
