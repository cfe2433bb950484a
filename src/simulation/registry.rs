//! Entity registry - the live population and its event-driven transitions
//!
//! Only the simulation tick holds a `&mut Registry`. Primary agents are
//! indexed by agent id so that a second start, or activity for an agent we
//! never saw start, resolves to a single entity.

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::entity::{
    AgentPhase, Ambient, AmbientSpecies, Entity, EntityKind, ExitVariant, Label, MarkerPhase,
    Motion, PrimaryAgent, ScheduledExit, TaskMarker, ToolEffect, ToolPhase, ToolStyle, Transition,
    AGENT_WIDTH,
};
use crate::core::types::{Bounds, EntityId, Facing, SimTime, Vec2};
use crate::core::{Result, SimulationConfig, TidepoolError};
use crate::event::{Event, EventKind, MAIN_AGENT_ID};

/// Something the registry did that the rest of the tick reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    AgentEntered { id: EntityId, agent_id: String, position: Vec2 },
    /// Activity for an unknown agent created it directly in `Active`
    OrphanSynthesized { id: EntityId, agent_id: String, position: Vec2 },
    AgentRevived { id: EntityId },
    AgentActivated { id: EntityId },
    AgentExiting { id: EntityId, variant: ExitVariant, position: Vec2, title: String },
    AgentGone { id: EntityId, agent_id: String },
    ToolSpawned { id: EntityId, style: ToolStyle },
    ToolExpired { id: EntityId },
    MarkerPlaced { id: EntityId, position: Vec2 },
    MarkerSettled { id: EntityId },
}

/// Per-call inputs shared by event application and time advancement
pub struct StepContext<'a> {
    pub now: SimTime,
    pub dt: f64,
    pub bounds: Bounds,
    pub config: &'a SimulationConfig,
    pub rng: &'a mut ChaCha8Rng,
}

#[derive(Debug, Default)]
pub struct Registry {
    entities: BTreeMap<EntityId, Entity>,
    agents: AHashMap<String, EntityId>,
    markers: AHashMap<String, EntityId>,
    next_id: u64,
    activated_ids: AHashSet<String>,
    activated_total: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// The live agent entity for an agent id
    pub fn agent(&self, agent_id: &str) -> Option<&Entity> {
        self.agents.get(agent_id).and_then(|id| self.entities.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn agent_count_in(&self, phases: &[AgentPhase]) -> usize {
        self.iter()
            .filter_map(Entity::as_agent)
            .filter(|agent| phases.contains(&agent.phase))
            .count()
    }

    /// Ambient creatures, oldest first
    pub fn ambient_ids(&self) -> Vec<(EntityId, AmbientSpecies)> {
        self.iter()
            .filter_map(|e| match &e.kind {
                EntityKind::Ambient(ambient) => Some((e.id, ambient.species)),
                _ => None,
            })
            .collect()
    }

    /// Distinct agent ids that have been `Active` at least once
    pub fn activated_agent_ids(&self) -> usize {
        self.activated_ids.len()
    }

    /// Agent entities that have been `Active` at least once
    pub fn activated_total(&self) -> u64 {
        self.activated_total
    }

    /// Apply one event
    pub fn apply(&mut self, event: &Event, ctx: &mut StepContext<'_>) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        match event.kind() {
            EventKind::AgentStart => self.on_agent_start(event, ctx, &mut outcomes),
            EventKind::AgentWorking => {
                let id = self.ensure_agent(event, ctx, &mut outcomes);
                let text = event.description().unwrap_or("working").to_string();
                self.touch_agent(id, Some(&text), ctx);
            }
            EventKind::AgentStop => self.on_agent_stop(event, ctx, &mut outcomes),
            EventKind::ToolStart => self.on_tool_start(event, ctx, &mut outcomes),
            EventKind::ToolStop | EventKind::ToolError => {
                let id = self.ensure_agent(event, ctx, &mut outcomes);
                self.touch_agent(id, None, ctx);
                if let Some(agent) = self.entities.get_mut(&id).and_then(Entity::as_agent_mut) {
                    if agent.current_tool.as_deref() == event.tool_name() {
                        agent.current_tool = None;
                    }
                }
            }
            EventKind::TaskCompleted => self.on_task_completed(event, ctx, &mut outcomes),
        }
        outcomes
    }

    fn on_agent_start(&mut self, event: &Event, ctx: &mut StepContext<'_>, outcomes: &mut Vec<Outcome>) {
        let title = agent_title(event);
        if let Some(&id) = self.agents.get(event.agent_id()) {
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.last_event_at = ctx.now;
                if let EntityKind::PrimaryAgent(agent) = &mut entity.kind {
                    if let Some(agent_type) = event.agent_type() {
                        agent.agent_type = Some(agent_type.to_string());
                    }
                    if event.description().is_some() || event.agent_type().is_some() {
                        agent.title = title;
                    }
                    // A start no newer than a stop we already applied arrived out
                    // of order; the stop stands
                    if agent.last_stop_at.is_some_and(|stopped| event.timestamp() <= stopped) {
                        debug!(agent_id = event.agent_id(), "Start older than applied stop");
                        return;
                    }
                    // A late start adopts the orphan; it now waits for a real stop
                    agent.scheduled_exit = None;
                    if agent.phase == AgentPhase::Exiting {
                        agent.phase = AgentPhase::Active;
                        agent.phase_started = ctx.now;
                        agent.exit_variant = None;
                        outcomes.push(Outcome::AgentRevived { id });
                    }
                    debug!(agent_id = event.agent_id(), phase = ?agent.phase, "Duplicate start updated agent");
                }
            }
            return;
        }

        let bounds = ctx.bounds;
        let y = ctx
            .rng
            .gen_range(bounds.ocean_top() + 1.0..(bounds.floor_row() - 3.0).max(bounds.ocean_top() + 2.0));
        let position = Vec2::new(-AGENT_WIDTH - 2.0, y);
        let speed = ctx.rng.gen_range(4.0..10.0);
        let id = self.allocate_id();
        let agent = PrimaryAgent {
            agent_id: event.agent_id().to_string(),
            agent_type: event.agent_type().map(str::to_string),
            title,
            phase: AgentPhase::Entering,
            phase_started: ctx.now,
            exit_variant: None,
            pending_exit: None,
            scheduled_exit: None,
            orphan: false,
            resident: false,
            last_stop_at: None,
            tool_calls: 0,
            current_tool: None,
        };
        self.insert_agent(id, agent, Motion::new(position, speed, Facing::Right), ctx.now);
        debug!(agent_id = event.agent_id(), id = id.0, "Agent entering");
        outcomes.push(Outcome::AgentEntered {
            id,
            agent_id: event.agent_id().to_string(),
            position,
        });
    }

    fn on_agent_stop(&mut self, event: &Event, ctx: &mut StepContext<'_>, outcomes: &mut Vec<Outcome>) {
        let variant = if event.is_error() {
            ExitVariant::Error
        } else {
            ExitVariant::Normal
        };

        let Some(&id) = self.agents.get(event.agent_id()) else {
            // Orphaned stop: show the agent briefly, then let it leave
            let schedule = ScheduledExit {
                at: ctx.now + ctx.config.orphan_stop_linger_secs,
                variant,
                from_stop: true,
            };
            self.synthesize_orphan(event, ctx, outcomes, schedule);
            return;
        };

        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.last_event_at = ctx.now;
        let position = entity.motion.position;
        let Some(agent) = entity.as_agent_mut() else {
            return;
        };
        if agent.resident {
            debug!(agent_id = event.agent_id(), "Stop ignored for resident agent");
            return;
        }
        agent.last_stop_at = Some(agent.last_stop_at.map_or(event.timestamp(), |t| t.max(event.timestamp())));
        match agent.phase {
            AgentPhase::Entering => {
                agent.pending_exit = Some(variant);
                debug!(agent_id = event.agent_id(), "Stop deferred until entry completes");
            }
            AgentPhase::Active => {
                agent.begin_exit(variant, ctx.now);
                outcomes.push(Outcome::AgentExiting {
                    id,
                    variant,
                    position,
                    title: agent.title.clone(),
                });
            }
            AgentPhase::Exiting | AgentPhase::Gone => {
                debug!(agent_id = event.agent_id(), "Repeated stop ignored");
            }
        }
    }

    fn on_tool_start(&mut self, event: &Event, ctx: &mut StepContext<'_>, outcomes: &mut Vec<Outcome>) {
        let agent_entity = self.ensure_agent(event, ctx, outcomes);
        let label = event.tool_label();
        self.touch_agent(agent_entity, label.as_deref(), ctx);

        let tool_name = event.tool_name().unwrap_or_default().to_string();
        let mut origin = Vec2::new(ctx.bounds.width / 2.0, ctx.bounds.ocean_mid());
        let mut parent_facing = Facing::Right;
        if let Some(entity) = self.entities.get_mut(&agent_entity) {
            origin = entity.motion.position;
            parent_facing = entity.motion.facing;
            if let Some(agent) = entity.as_agent_mut() {
                agent.tool_calls += 1;
                agent.current_tool = Some(tool_name.clone());
            }
        }

        let style = ToolStyle::from_tool_name(&tool_name);
        let id = self.insert_tool_effect(event, style, origin, parent_facing, ctx);
        outcomes.push(Outcome::ToolSpawned { id, style });

        // Sub-agents sometimes bring a companion along
        if event.agent_id() != MAIN_AGENT_ID && ctx.rng.gen_bool(ctx.config.tool_creature_chance) {
            let companion = match ctx.rng.gen_range(0..3) {
                0 => ToolStyle::Shrimp,
                1 => ToolStyle::SmallFish,
                _ => ToolStyle::Crab,
            };
            let id = self.insert_tool_effect(event, companion, origin, parent_facing, ctx);
            outcomes.push(Outcome::ToolSpawned { id, style: companion });
        }
    }

    fn insert_tool_effect(
        &mut self,
        event: &Event,
        style: ToolStyle,
        origin: Vec2,
        parent_facing: Facing,
        ctx: &mut StepContext<'_>,
    ) -> EntityId {
        let bounds = ctx.bounds;
        let (position, speed, facing) = match style {
            ToolStyle::Bubble => (
                Vec2::new(origin.x + ctx.rng.gen_range(-2.0..5.0), (origin.y - 1.0).max(bounds.ocean_top())),
                ctx.rng.gen_range(3.0..6.0),
                Facing::Right,
            ),
            ToolStyle::Sailboat => (Vec2::new(-12.0, bounds.surface_row() - 3.0), 4.0, Facing::Right),
            ToolStyle::Dolphin => (
                Vec2::new(
                    -12.0,
                    ctx.rng
                        .gen_range(bounds.ocean_top()..(bounds.ocean_mid()).max(bounds.ocean_top() + 1.0)),
                ),
                ctx.rng.gen_range(8.0..14.0),
                Facing::Right,
            ),
            ToolStyle::Shrimp | ToolStyle::SmallFish => (
                Vec2::new(
                    origin.x + ctx.rng.gen_range(-3.0..3.0),
                    (origin.y + ctx.rng.gen_range(-1.0..2.0)).clamp(bounds.ocean_top(), bounds.floor_row() - 1.0),
                ),
                ctx.rng.gen_range(2.0..4.0),
                parent_facing.flipped(),
            ),
            ToolStyle::Crab => (
                Vec2::new(origin.x + ctx.rng.gen_range(-3.0..3.0), bounds.floor_row()),
                ctx.rng.gen_range(2.0..4.0),
                parent_facing.flipped(),
            ),
        };

        let id = self.allocate_id();
        let ttl = ctx.config.tool_effect_ttl_secs * style.ttl_factor();
        let label = if style.is_companion() {
            None
        } else {
            event.summary().map(|summary| Label::new(summary, ctx.now, ttl))
        };
        self.entities.insert(
            id,
            Entity {
                id,
                kind: EntityKind::ToolEffect(ToolEffect {
                    tool_name: event.tool_name().unwrap_or_default().to_string(),
                    agent_id: event.agent_id().to_string(),
                    style,
                    phase: ToolPhase::Spawned,
                    rise_at: ctx.now + ctx.config.tool_effect_spawn_secs,
                    expires_at: ctx.now + ttl,
                }),
                motion: Motion::new(position, speed, facing),
                spawned_at: ctx.now,
                last_event_at: ctx.now,
                label,
            },
        );
        id
    }

    fn on_task_completed(&mut self, event: &Event, ctx: &mut StepContext<'_>, outcomes: &mut Vec<Outcome>) {
        let subject = event.task_subject().unwrap_or("task").to_string();
        if let Some(entity) = self.markers.get(&subject).and_then(|id| self.entities.get_mut(id)) {
            entity.last_event_at = ctx.now;
            if let EntityKind::TaskMarker(marker) = &mut entity.kind {
                marker.completions += 1;
            }
            return;
        }

        let bounds = ctx.bounds;
        let x = ctx.rng.gen_range(3.0..(bounds.width - 15.0).max(4.0));
        let start_y = bounds.ocean_top();
        let settle = ctx.config.marker_settle_secs.max(0.05);
        let speed = ((bounds.floor_row() - start_y) as f64 / settle) as f32;
        let position = Vec2::new(x, start_y);
        let id = self.allocate_id();
        self.entities.insert(
            id,
            Entity {
                id,
                kind: EntityKind::TaskMarker(TaskMarker {
                    subject: subject.clone(),
                    phase: MarkerPhase::Spawned,
                    settle_at: ctx.now + settle,
                    completions: 1,
                }),
                motion: Motion::new(position, speed, Facing::Right),
                spawned_at: ctx.now,
                last_event_at: ctx.now,
                label: None,
            },
        );
        self.markers.insert(subject, id);
        outcomes.push(Outcome::MarkerPlaced { id, position });
    }

    /// Resolve the agent an activity event refers to, synthesizing an
    /// orphan when none is live
    fn ensure_agent(&mut self, event: &Event, ctx: &mut StepContext<'_>, outcomes: &mut Vec<Outcome>) -> EntityId {
        if let Some(&id) = self.agents.get(event.agent_id()) {
            return id;
        }
        let schedule = ScheduledExit {
            at: ctx.now + ctx.config.orphan_linger_secs,
            variant: ExitVariant::Normal,
            from_stop: false,
        };
        self.synthesize_orphan(event, ctx, outcomes, schedule)
    }

    fn synthesize_orphan(
        &mut self,
        event: &Event,
        ctx: &mut StepContext<'_>,
        outcomes: &mut Vec<Outcome>,
        schedule: ScheduledExit,
    ) -> EntityId {
        let bounds = ctx.bounds;
        let x = ctx.rng.gen_range(5.0..(bounds.width - AGENT_WIDTH - 5.0).max(6.0));
        let y = ctx
            .rng
            .gen_range(bounds.ocean_top() + 1.0..(bounds.floor_row() - 3.0).max(bounds.ocean_top() + 2.0));
        let position = Vec2::new(x, y);
        let speed = ctx.rng.gen_range(4.0..10.0);
        let facing = if ctx.rng.gen_bool(0.5) { Facing::Right } else { Facing::Left };

        let id = self.allocate_id();
        let agent = PrimaryAgent {
            agent_id: event.agent_id().to_string(),
            agent_type: event.agent_type().map(str::to_string),
            title: agent_title(event),
            phase: AgentPhase::Active,
            phase_started: ctx.now,
            exit_variant: None,
            pending_exit: None,
            scheduled_exit: Some(schedule),
            orphan: true,
            resident: false,
            last_stop_at: schedule.from_stop.then(|| event.timestamp()),
            tool_calls: 0,
            current_tool: None,
        };
        self.insert_agent(id, agent, Motion::new(position, speed, facing), ctx.now);
        self.mark_activated(event.agent_id());
        debug!(agent_id = event.agent_id(), kind = %event.kind(), id = id.0, "Synthesized orphan agent");
        outcomes.push(Outcome::OrphanSynthesized {
            id,
            agent_id: event.agent_id().to_string(),
            position,
        });
        id
    }

    /// Add an agent that stays for the whole session, such as the main
    /// session's creature; it is never counted as an orphan and ignores stops
    pub fn spawn_resident(&mut self, agent_id: &str, title: &str, ctx: &mut StepContext<'_>) -> EntityId {
        if let Some(&id) = self.agents.get(agent_id) {
            return id;
        }
        let bounds = ctx.bounds;
        let position = Vec2::new(bounds.width / 2.0, bounds.ocean_mid());
        let speed = ctx.rng.gen_range(2.0..3.5);
        let id = self.allocate_id();
        let agent = PrimaryAgent {
            agent_id: agent_id.to_string(),
            agent_type: None,
            title: title.to_string(),
            phase: AgentPhase::Active,
            phase_started: ctx.now,
            exit_variant: None,
            pending_exit: None,
            scheduled_exit: None,
            orphan: false,
            resident: true,
            last_stop_at: None,
            tool_calls: 0,
            current_tool: None,
        };
        self.insert_agent(id, agent, Motion::new(position, speed, Facing::Right), ctx.now);
        debug!(agent_id, id = id.0, "Resident agent placed");
        id
    }

    fn insert_agent(&mut self, id: EntityId, agent: PrimaryAgent, motion: Motion, now: SimTime) {
        self.agents.insert(agent.agent_id.clone(), id);
        self.entities.insert(
            id,
            Entity {
                id,
                kind: EntityKind::PrimaryAgent(agent),
                motion,
                spawned_at: now,
                last_event_at: now,
                label: None,
            },
        );
    }

    /// Refresh an agent's activity time and label; extends an orphan's stay
    fn touch_agent(&mut self, id: EntityId, label: Option<&str>, ctx: &StepContext<'_>) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.last_event_at = ctx.now;
        if let Some(text) = label {
            entity.label = Some(Label::new(text, ctx.now, ctx.config.label_ttl_secs));
        }
        if let Some(agent) = entity.as_agent_mut() {
            if let Some(scheduled) = agent.scheduled_exit.as_mut().filter(|s| !s.from_stop) {
                scheduled.at = scheduled.at.max(ctx.now + ctx.config.orphan_linger_secs);
            }
        }
    }

    fn mark_activated(&mut self, agent_id: &str) {
        self.activated_total += 1;
        self.activated_ids.insert(agent_id.to_string());
    }

    /// Add an ambient creature
    pub fn spawn_ambient(&mut self, species: AmbientSpecies, ctx: &mut StepContext<'_>) -> EntityId {
        let bounds = ctx.bounds;
        let (y, speed) = match species {
            AmbientSpecies::Jellyfish => (
                ctx.rng.gen_range(bounds.ocean_top() + 1.0..bounds.ocean_mid().max(bounds.ocean_top() + 2.0)),
                ctx.rng.gen_range(0.2..0.6),
            ),
            AmbientSpecies::Fish => (
                ctx.rng.gen_range(bounds.ocean_top() + 1.0..(bounds.floor_row() - 2.0).max(bounds.ocean_top() + 2.0)),
                ctx.rng.gen_range(2.0..4.0),
            ),
            AmbientSpecies::Bird => (ctx.rng.gen_range(0.0..3.0), ctx.rng.gen_range(1.6..3.0)),
        };
        let x = ctx.rng.gen_range(0.0..bounds.width);
        let facing = if ctx.rng.gen_bool(0.5) { Facing::Right } else { Facing::Left };
        let bob_offset = ctx.rng.gen_range(0.0..std::f32::consts::TAU);

        let id = self.allocate_id();
        self.entities.insert(
            id,
            Entity {
                id,
                kind: EntityKind::Ambient(Ambient {
                    species,
                    bob_offset,
                    base_y: y,
                }),
                motion: Motion::new(Vec2::new(x, y), speed, facing),
                spawned_at: ctx.now,
                last_event_at: ctx.now,
                label: None,
            },
        );
        id
    }

    /// Remove an ambient creature; event-driven entities are never despawned this way
    pub fn despawn_ambient(&mut self, id: EntityId) -> bool {
        match self.entities.get(&id) {
            Some(entity) if matches!(entity.kind, EntityKind::Ambient(_)) => {
                self.entities.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Advance every entity by one step and drop those that reached a
    /// terminal state
    pub fn advance(&mut self, ctx: &mut StepContext<'_>) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        let mut newly_active = Vec::new();

        for entity in self.entities.values_mut() {
            let Some(transition) = entity.advance(ctx.dt, ctx.now, &ctx.bounds, ctx.config, &mut *ctx.rng) else {
                continue;
            };
            let id = entity.id;
            let position = entity.motion.position;
            match (transition, &entity.kind) {
                (Transition::AgentActivated, EntityKind::PrimaryAgent(agent)) => {
                    newly_active.push(agent.agent_id.clone());
                    outcomes.push(Outcome::AgentActivated { id });
                }
                (Transition::AgentExiting(variant), EntityKind::PrimaryAgent(agent)) => {
                    outcomes.push(Outcome::AgentExiting {
                        id,
                        variant,
                        position,
                        title: agent.title.clone(),
                    });
                }
                (Transition::AgentGone, EntityKind::PrimaryAgent(agent)) => {
                    outcomes.push(Outcome::AgentGone {
                        id,
                        agent_id: agent.agent_id.clone(),
                    });
                }
                (Transition::ToolExpired, _) => outcomes.push(Outcome::ToolExpired { id }),
                (Transition::MarkerSettled, _) => outcomes.push(Outcome::MarkerSettled { id }),
                _ => {}
            }
        }

        for agent_id in newly_active {
            self.mark_activated(&agent_id);
        }

        let terminal: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.is_terminal())
            .map(|e| e.id)
            .collect();
        for id in terminal {
            if let Some(entity) = self.entities.remove(&id) {
                if let Some(agent) = entity.as_agent() {
                    if self.agents.get(&agent.agent_id) == Some(&id) {
                        self.agents.remove(&agent.agent_id);
                    }
                }
            }
        }

        outcomes
    }

    /// Keep everything inside a new drawable area
    pub fn clamp_to(&mut self, bounds: &Bounds) {
        for entity in self.entities.values_mut() {
            let pos = &mut entity.motion.position;
            match &entity.kind {
                EntityKind::TaskMarker(_) => {
                    pos.x = pos.x.min(bounds.width - 4.0).max(0.0);
                    pos.y = pos.y.min(bounds.floor_row());
                }
                EntityKind::Ambient(ambient) if ambient.species.lives_in_sky() => {}
                EntityKind::ToolEffect(tool) if tool.style == ToolStyle::Crab => {
                    pos.y = bounds.floor_row();
                }
                _ => {
                    pos.y = pos.y.min(bounds.floor_row() - 1.0);
                }
            }
        }
    }

    /// At most one live agent entity per agent id, and the index agrees
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen: AHashMap<&str, EntityId> = AHashMap::new();
        for entity in self.entities.values() {
            let Some(agent) = entity.as_agent() else {
                continue;
            };
            if !agent.is_live() {
                continue;
            }
            if let Some(other) = seen.insert(&agent.agent_id, entity.id) {
                return Err(TidepoolError::InvariantViolation(format!(
                    "agent {:?} has two live entities ({} and {})",
                    agent.agent_id, other.0, entity.id.0
                )));
            }
            if self.agents.get(&agent.agent_id) != Some(&entity.id) {
                return Err(TidepoolError::InvariantViolation(format!(
                    "agent {:?} is not indexed to entity {}",
                    agent.agent_id, entity.id.0
                )));
            }
        }
        if seen.len() != self.agents.len() {
            return Err(TidepoolError::InvariantViolation(format!(
                "agent index holds {} ids for {} live agents",
                self.agents.len(),
                seen.len()
            )));
        }
        Ok(())
    }
}

fn agent_title(event: &Event) -> String {
    event
        .description()
        .or_else(|| event.agent_type())
        .unwrap_or_else(|| event.agent_id())
        .to_string()
}
