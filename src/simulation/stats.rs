//! Session statistics
//!
//! Counters only ever grow. They are updated in the same step that applies
//! each event to the registry, so they always describe the registry's history.

use std::collections::BTreeMap;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind};

#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub events_seen: u64,
    pub tool_counts: BTreeMap<String, u64>,
    pub total_tool_calls: u64,
    pub error_count: u64,
    pub tasks_completed: u64,
    pub orphan_count: u64,
    pub milestones_fired: u64,
    /// Wall-clock start of the session (Unix seconds)
    pub session_start: f64,
    agent_ids: AHashSet<String>,
}

/// Copy of [`SessionStats`] carried in a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsView {
    pub events_seen: u64,
    pub tool_counts: BTreeMap<String, u64>,
    pub total_tool_calls: u64,
    pub agent_count: u64,
    pub active_agents: u64,
    pub error_count: u64,
    pub tasks_completed: u64,
    pub orphan_count: u64,
    pub milestones_fired: u64,
    pub uptime_secs: f64,
}

impl SessionStats {
    pub fn new(session_start: f64) -> Self {
        Self {
            session_start,
            ..Self::default()
        }
    }

    /// Count one applied event
    pub fn record_event(&mut self, event: &Event) {
        self.events_seen += 1;
        match event.kind() {
            EventKind::ToolStart => {
                if let Some(tool) = event.tool_name() {
                    *self.tool_counts.entry(tool.to_string()).or_insert(0) += 1;
                    self.total_tool_calls += 1;
                }
            }
            EventKind::TaskCompleted => self.tasks_completed += 1,
            _ => {}
        }
        if event.is_error() {
            self.error_count += 1;
        }
    }

    /// Note an agent id the registry created an entity for; true if new
    pub fn record_agent(&mut self, agent_id: &str) -> bool {
        self.agent_ids.insert(agent_id.to_string())
    }

    pub fn record_orphan(&mut self) {
        self.orphan_count += 1;
    }

    /// Distinct agent ids seen this session
    pub fn agent_count(&self) -> u64 {
        self.agent_ids.len() as u64
    }

    pub fn tool_count(&self, tool: &str) -> u64 {
        self.tool_counts.get(tool).copied().unwrap_or(0)
    }

    /// Most used tools, highest count first, ties by name
    pub fn top_tools(&self, n: usize) -> Vec<(String, u64)> {
        let mut tools: Vec<(String, u64)> = self
            .tool_counts
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        tools.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tools.truncate(n);
        tools
    }

    pub fn view(&self, active_agents: u64, now_unix: f64) -> StatsView {
        StatsView {
            events_seen: self.events_seen,
            tool_counts: self.tool_counts.clone(),
            total_tool_calls: self.total_tool_calls,
            agent_count: self.agent_count(),
            active_agents,
            error_count: self.error_count,
            tasks_completed: self.tasks_completed,
            orphan_count: self.orphan_count,
            milestones_fired: self.milestones_fired,
            uptime_secs: (now_unix - self.session_start).max(0.0),
        }
    }
}

impl StatsView {
    pub fn tool_count(&self, tool: &str) -> u64 {
        self.tool_counts.get(tool).copied().unwrap_or(0)
    }

    pub fn top_tools(&self, n: usize) -> Vec<(&str, u64)> {
        let mut tools: Vec<(&str, u64)> = self
            .tool_counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        tools.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        tools.truncate(n);
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_tools_by_name() {
        let mut stats = SessionStats::new(0.0);
        stats.record_event(&Event::tool_start("a1", "Read", 0.0));
        stats.record_event(&Event::tool_start("a1", "Read", 0.0));
        stats.record_event(&Event::tool_start("a1", "Bash", 0.0));
        stats.record_event(&Event::tool_stop("a1", "Bash", 0.0));

        assert_eq!(stats.tool_count("Read"), 2);
        assert_eq!(stats.total_tool_calls, 3);
        assert_eq!(stats.events_seen, 4);
        assert_eq!(stats.top_tools(1), vec![("Read".to_string(), 2)]);
    }

    #[test]
    fn test_errors_and_tasks() {
        let mut stats = SessionStats::new(0.0);
        stats.record_event(&Event::agent_stop("a1", 0.0, true));
        stats.record_event(&Event::tool_error("a1", "Bash", 0.0));
        stats.record_event(&Event::agent_stop("a2", 0.0, false));
        stats.record_event(&Event::task_completed("Fix auth", 0.0));
        assert_eq!(stats.error_count, 2);
        assert_eq!(stats.tasks_completed, 1);
    }

    #[test]
    fn test_agent_count_is_distinct() {
        let mut stats = SessionStats::new(0.0);
        assert!(stats.record_agent("a1"));
        assert!(!stats.record_agent("a1"));
        assert!(stats.record_agent("a2"));
        assert_eq!(stats.agent_count(), 2);
    }

    #[test]
    fn test_view_uptime() {
        let stats = SessionStats::new(100.0);
        let view = stats.view(3, 160.0);
        assert_eq!(view.uptime_secs, 60.0);
        assert_eq!(view.active_agents, 3);
        assert_eq!(stats.view(0, 50.0).uptime_secs, 0.0);
    }
}
