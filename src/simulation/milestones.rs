//! Milestones - one-time celebrations of cumulative statistics

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::stats::SessionStats;
use crate::core::SimulationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MilestoneKind {
    ToolCalls,
    Agents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub threshold: u64,
    pub message: String,
}

impl Milestone {
    fn new(kind: MilestoneKind, threshold: u64) -> Self {
        let message = match kind {
            MilestoneKind::ToolCalls => format!("{} tool calls! The ocean comes alive!", threshold),
            MilestoneKind::Agents => format!("{} agents spawned! A school of fish appears!", threshold),
        };
        Self {
            kind,
            threshold,
            message,
        }
    }
}

/// Fires each configured threshold at most once per session
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    tool_thresholds: Vec<u64>,
    agent_thresholds: Vec<u64>,
    triggered: BTreeSet<(MilestoneKind, u64)>,
}

impl MilestoneTracker {
    pub fn new(config: &SimulationConfig) -> Self {
        let sorted = |values: &[u64]| {
            let mut values = values.to_vec();
            values.sort_unstable();
            values.dedup();
            values
        };
        Self {
            tool_thresholds: sorted(&config.tool_milestones),
            agent_thresholds: sorted(&config.agent_milestones),
            triggered: BTreeSet::new(),
        }
    }

    /// Milestones crossed since the last evaluation, lowest threshold first
    pub fn evaluate(&mut self, stats: &SessionStats) -> Vec<Milestone> {
        let mut fired = Vec::new();
        let checks = [
            (MilestoneKind::ToolCalls, &self.tool_thresholds, stats.total_tool_calls),
            (MilestoneKind::Agents, &self.agent_thresholds, stats.agent_count()),
        ];
        for (kind, thresholds, value) in checks {
            for &threshold in thresholds.iter().filter(|&&t| value >= t) {
                if self.triggered.insert((kind, threshold)) {
                    fired.push(Milestone::new(kind, threshold));
                }
            }
        }
        fired
    }

    pub fn is_triggered(&self, kind: MilestoneKind, threshold: u64) -> bool {
        self.triggered.contains(&(kind, threshold))
    }

    pub fn fired_count(&self) -> usize {
        self.triggered.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn stats_with_tools(n: usize) -> SessionStats {
        let mut stats = SessionStats::new(0.0);
        for i in 0..n {
            stats.record_event(&Event::tool_start("a1", &format!("Tool{}", i), 0.0));
        }
        stats
    }

    #[test]
    fn test_fires_once_per_threshold() {
        let mut tracker = MilestoneTracker::new(&SimulationConfig::default());
        assert!(tracker.evaluate(&stats_with_tools(19)).is_empty());

        let fired = tracker.evaluate(&stats_with_tools(20));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].threshold, 20);

        assert!(tracker.evaluate(&stats_with_tools(25)).is_empty());
        assert!(tracker.is_triggered(MilestoneKind::ToolCalls, 20));
    }

    #[test]
    fn test_jump_past_several_thresholds() {
        let mut tracker = MilestoneTracker::new(&SimulationConfig::default());
        let fired = tracker.evaluate(&stats_with_tools(150));
        let thresholds: Vec<u64> = fired.iter().map(|m| m.threshold).collect();
        assert_eq!(thresholds, vec![20, 100]);
        assert_eq!(tracker.fired_count(), 2);
    }

    #[test]
    fn test_agent_milestone() {
        let mut tracker = MilestoneTracker::new(&SimulationConfig::default());
        let mut stats = SessionStats::new(0.0);
        for i in 0..10 {
            stats.record_agent(&format!("a{}", i));
        }
        let fired = tracker.evaluate(&stats);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, MilestoneKind::Agents);
        assert!(fired[0].message.contains("10 agents"));
    }
}
