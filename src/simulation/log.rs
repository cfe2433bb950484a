//! Rolling event log shown in the viewer's log panel

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind};

/// Longest detail text kept per entry
pub const DETAIL_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCategory {
    Event(EventKind),
    Milestone,
    Orphan,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Event(kind) => kind.as_str(),
            LogCategory::Milestone => "milestone",
            LogCategory::Orphan => "orphan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Producer timestamp (Unix seconds)
    pub timestamp: f64,
    pub category: LogCategory,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, timestamp: f64, category: LogCategory, detail: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp,
            category,
            detail: detail.chars().take(DETAIL_MAX_CHARS).collect(),
        });
    }

    /// Log an applied event with a one-line description
    pub fn record(&mut self, event: &Event) {
        let agent_type = event.agent_type().unwrap_or(event.agent_id());
        let detail = match event.kind() {
            EventKind::AgentStart => {
                format!("{}: {}", agent_type, event.description().unwrap_or("started"))
            }
            EventKind::AgentWorking => {
                format!("{}: {}", agent_type, event.description().unwrap_or("working"))
            }
            EventKind::AgentStop => {
                format!("{}: {}", agent_type, if event.is_error() { "ERROR" } else { "done" })
            }
            EventKind::ToolStart => event.tool_label().unwrap_or_default(),
            EventKind::ToolStop => format!("{}: ok", event.tool_name().unwrap_or_default()),
            EventKind::ToolError => format!("{}: fail", event.tool_name().unwrap_or_default()),
            EventKind::TaskCompleted => format!("task: {}", event.task_subject().unwrap_or("task")),
        };
        self.push(event.timestamp(), LogCategory::Event(event.kind()), &detail);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `n` most recent entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_capacity_keeps_newest() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.record(&Event::agent_working(&format!("a{}", i), i as f64));
        }
        assert_eq!(log.len(), 3);
        let recent = log.recent(10);
        assert_eq!(recent[0].timestamp, 2.0);
        assert_eq!(recent[2].timestamp, 4.0);
    }

    #[test]
    fn test_detail_formats() {
        let mut log = EventLog::new(10);
        log.record(
            &Event::agent_start("a1", 0.0)
                .with_field("agent_type", Value::from("Explore"))
                .with_field("description", Value::from("Find endpoints")),
        );
        log.record(&Event::agent_stop("a1", 0.0, true).with_field("agent_type", Value::from("Explore")));
        log.record(&Event::tool_error("a1", "Bash", 0.0));
        log.record(&Event::task_completed("Fix auth", 0.0));

        let details: Vec<String> = log.recent(4).into_iter().map(|e| e.detail).collect();
        assert_eq!(
            details,
            vec!["Explore: Find endpoints", "Explore: ERROR", "Bash: fail", "task: Fix auth"]
        );
    }

    #[test]
    fn test_detail_is_truncated() {
        let mut log = EventLog::new(1);
        log.push(0.0, LogCategory::Milestone, &"y".repeat(120));
        assert_eq!(log.recent(1)[0].detail.chars().count(), DETAIL_MAX_CHARS);
    }
}
