//! Immutable per-tick view handed to the renderer
//!
//! A snapshot owns copies of everything it shows. The renderer never sees
//! the registry, so nothing it does can race a tick.

use serde::{Deserialize, Serialize};

use super::effects::Effect;
use super::entity::{
    AgentPhase, AmbientSpecies, Entity, EntityKind, ExitVariant, MarkerPhase, ToolPhase, ToolStyle,
};
use super::environment::EnvironmentState;
use super::log::LogEntry;
use super::stats::StatsView;
use crate::core::types::{Bounds, EntityId, Facing, SimTime, Tick, Vec2};
use crate::core::SimulationConfig;
use crate::ingest::IngestStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelView {
    pub text: String,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityViewKind {
    Agent {
        agent_id: String,
        agent_type: Option<String>,
        title: String,
        phase: AgentPhase,
        exit_variant: Option<ExitVariant>,
        orphan: bool,
        tool_calls: u64,
        current_tool: Option<String>,
        /// Progress through entering/exiting (0.0 - 1.0)
        phase_progress: f32,
    },
    Tool {
        tool_name: String,
        style: ToolStyle,
        phase: ToolPhase,
        agent_id: String,
    },
    Marker {
        subject: String,
        phase: MarkerPhase,
        completions: u32,
    },
    Ambient {
        species: AmbientSpecies,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityViewKind,
    pub position: Vec2,
    pub facing: Facing,
    pub label: Option<LabelView>,
    pub spawned_at: SimTime,
    pub last_event_at: SimTime,
}

impl EntityView {
    pub fn from_entity(entity: &Entity, now: SimTime, config: &SimulationConfig) -> Self {
        let kind = match &entity.kind {
            EntityKind::PrimaryAgent(agent) => EntityViewKind::Agent {
                agent_id: agent.agent_id.clone(),
                agent_type: agent.agent_type.clone(),
                title: agent.title.clone(),
                phase: agent.phase,
                exit_variant: agent.exit_variant,
                orphan: agent.orphan,
                tool_calls: agent.tool_calls,
                current_tool: agent.current_tool.clone(),
                phase_progress: agent.phase_progress(now, config),
            },
            EntityKind::ToolEffect(tool) => EntityViewKind::Tool {
                tool_name: tool.tool_name.clone(),
                style: tool.style,
                phase: tool.phase,
                agent_id: tool.agent_id.clone(),
            },
            EntityKind::TaskMarker(marker) => EntityViewKind::Marker {
                subject: marker.subject.clone(),
                phase: marker.phase,
                completions: marker.completions,
            },
            EntityKind::Ambient(ambient) => EntityViewKind::Ambient {
                species: ambient.species,
            },
        };
        let label = entity
            .label
            .as_ref()
            .filter(|label| !label.is_expired(now))
            .map(|label| LabelView {
                text: label.text.clone(),
                opacity: label.opacity(now),
            });
        Self {
            id: entity.id,
            kind,
            position: entity.motion.position,
            facing: entity.motion.facing,
            label,
            spawned_at: entity.spawned_at,
            last_event_at: entity.last_event_at,
        }
    }

    pub fn agent_id(&self) -> Option<&str> {
        match &self.kind {
            EntityViewKind::Agent { agent_id, .. } => Some(agent_id),
            _ => None,
        }
    }

    pub fn agent_phase(&self) -> Option<AgentPhase> {
        match &self.kind {
            EntityViewKind::Agent { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    pub fn is_agent(&self) -> bool {
        matches!(self.kind, EntityViewKind::Agent { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: Tick,
    pub sim_time: SimTime,
    pub bounds: Bounds,
    /// Ordered by entity id
    pub entities: Vec<EntityView>,
    pub effects: Vec<Effect>,
    pub environment: EnvironmentState,
    pub stats: StatsView,
    pub ingest: IngestStats,
    /// Events discarded by the transfer queue so far
    pub queue_dropped: u64,
    /// Most recent log entries, oldest first
    pub log: Vec<LogEntry>,
}

impl Snapshot {
    pub fn find(&self, id: EntityId) -> Option<&EntityView> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| &self.entities[idx])
    }

    pub fn find_agent(&self, agent_id: &str) -> Option<&EntityView> {
        self.entities
            .iter()
            .find(|e| e.agent_id() == Some(agent_id) && e.agent_phase() != Some(AgentPhase::Gone))
    }

    pub fn agents(&self) -> impl Iterator<Item = &EntityView> {
        self.entities.iter().filter(|e| e.is_agent())
    }

    /// Agents a viewer may select, left to right on screen
    pub fn selectable_agents(&self) -> Vec<EntityId> {
        let mut agents: Vec<&EntityView> = self
            .agents()
            .filter(|e| e.agent_phase() != Some(AgentPhase::Gone))
            .collect();
        agents.sort_by(|a, b| {
            a.position
                .x
                .total_cmp(&b.position.x)
                .then_with(|| a.id.cmp(&b.id))
        });
        agents.into_iter().map(|e| e.id).collect()
    }

    pub fn count_agents_in(&self, phase: AgentPhase) -> usize {
        self.agents().filter(|e| e.agent_phase() == Some(phase)).count()
    }
}
