//! Entity definitions - the tagged union of everything living in the tank
//!
//! Every entity shares a [`Motion`] envelope; behavior is dispatched on
//! [`EntityKind`]. Lifecycle transitions caused by time passing happen in
//! [`Entity::advance`]; transitions caused by events live in the registry.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{Bounds, EntityId, Facing, SimTime, Vec2};
use crate::core::SimulationConfig;

/// Nominal width of an agent creature, used to keep it on screen
pub const AGENT_WIDTH: f32 = 8.0;

/// Longest label text kept on an entity
pub const LABEL_MAX_CHARS: usize = 25;

/// Fraction of a label's lifetime spent fading out
const LABEL_FADE_FRACTION: f64 = 0.3;

/// Primary agent lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentPhase {
    Entering,
    Active,
    Exiting,
    Gone,
}

/// How an agent left; drives its despawn visuals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitVariant {
    Normal,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolPhase {
    Spawned,
    Rising,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerPhase {
    Spawned,
    Settled,
}

/// Visual family of a tool effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolStyle {
    /// Plain tools: a labelled bubble rising from the caller
    Bubble,
    /// Codex MCP tools: a sailboat crossing the surface
    Sailboat,
    /// Other MCP tools: a dolphin
    Dolphin,
    /// Companion creatures that sometimes follow a sub-agent's tool call
    Shrimp,
    SmallFish,
    /// Walks along the floor
    Crab,
}

impl ToolStyle {
    pub fn from_tool_name(tool_name: &str) -> Self {
        if tool_name.starts_with("mcp__codex__") {
            ToolStyle::Sailboat
        } else if tool_name.starts_with("mcp__") {
            ToolStyle::Dolphin
        } else {
            ToolStyle::Bubble
        }
    }

    /// Lifetime multiplier relative to the base tool effect TTL
    pub fn ttl_factor(&self) -> f64 {
        match self {
            ToolStyle::Bubble => 1.0,
            ToolStyle::Dolphin => 3.0,
            ToolStyle::Sailboat => 4.0,
            ToolStyle::Shrimp | ToolStyle::SmallFish | ToolStyle::Crab => 2.5,
        }
    }

    /// Spawned alongside a tool call rather than representing it
    pub fn is_companion(&self) -> bool {
        matches!(self, ToolStyle::Shrimp | ToolStyle::SmallFish | ToolStyle::Crab)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmbientSpecies {
    Jellyfish,
    Fish,
    Bird,
}

impl AmbientSpecies {
    pub fn lives_in_sky(&self) -> bool {
        matches!(self, AmbientSpecies::Bird)
    }
}

/// Latest activity text shown next to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    pub set_at: SimTime,
    pub expires_at: SimTime,
}

impl Label {
    pub fn new(text: &str, now: SimTime, ttl: f64) -> Self {
        Self {
            text: text.chars().take(LABEL_MAX_CHARS).collect(),
            set_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: SimTime) -> bool {
        now >= self.expires_at
    }

    /// 1.0 while fresh, falling linearly to 0.0 over the final stretch
    pub fn opacity(&self, now: SimTime) -> f32 {
        let ttl = self.expires_at - self.set_at;
        if ttl <= 0.0 || now >= self.expires_at {
            return 0.0;
        }
        let fade_start = self.expires_at - ttl * LABEL_FADE_FRACTION;
        if now <= fade_start {
            1.0
        } else {
            ((self.expires_at - now) / (ttl * LABEL_FADE_FRACTION)) as f32
        }
    }
}

/// Position envelope shared by every entity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Motion {
    pub position: Vec2,
    /// Cells per second
    pub speed: f32,
    pub facing: Facing,
}

impl Motion {
    pub fn new(position: Vec2, speed: f32, facing: Facing) -> Self {
        Self {
            position,
            speed,
            facing,
        }
    }

    fn step_x(&mut self, dt: f32) {
        self.position.x += self.speed * self.facing.sign() * dt;
    }

    /// Turn around at the margins of `[lo, hi]`
    fn bounce(&mut self, lo: f32, hi: f32) {
        if self.position.x > hi {
            self.facing = Facing::Left;
        } else if self.position.x < lo {
            self.facing = Facing::Right;
        }
    }

    /// Re-enter from the opposite edge once fully off screen
    fn wrap(&mut self, width: f32, margin: f32) {
        if self.facing == Facing::Right && self.position.x > width + margin {
            self.position.x = -margin;
        } else if self.facing == Facing::Left && self.position.x < -margin {
            self.position.x = width + margin;
        }
    }
}

/// An exit the registry has scheduled rather than received
///
/// Used for orphans, which may never see a stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledExit {
    pub at: SimTime,
    pub variant: ExitVariant,
    /// Scheduled by a stop we received; activity never postpones it
    pub from_stop: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryAgent {
    pub agent_id: String,
    pub agent_type: Option<String>,
    /// Description, agent type, or the id when neither was reported
    pub title: String,
    pub phase: AgentPhase,
    pub phase_started: SimTime,
    pub exit_variant: Option<ExitVariant>,
    /// Stop received while still entering
    pub pending_exit: Option<ExitVariant>,
    pub scheduled_exit: Option<ScheduledExit>,
    /// Created from activity without a preceding start
    pub orphan: bool,
    /// Stays for the whole session and ignores stops
    pub resident: bool,
    /// Producer timestamp of the latest stop applied to this agent
    pub last_stop_at: Option<f64>,
    pub tool_calls: u64,
    pub current_tool: Option<String>,
}

impl PrimaryAgent {
    pub fn is_live(&self) -> bool {
        self.phase != AgentPhase::Gone
    }

    /// Progress through the current timed phase (0.0 - 1.0)
    pub fn phase_progress(&self, now: SimTime, config: &SimulationConfig) -> f32 {
        let duration = match self.phase {
            AgentPhase::Entering => config.entry_secs,
            AgentPhase::Exiting => config.exit_secs,
            AgentPhase::Active | AgentPhase::Gone => return 1.0,
        };
        (((now - self.phase_started) / duration).clamp(0.0, 1.0)) as f32
    }

    pub(crate) fn begin_exit(&mut self, variant: ExitVariant, now: SimTime) {
        self.phase = AgentPhase::Exiting;
        self.phase_started = now;
        self.exit_variant = Some(variant);
        self.pending_exit = None;
        self.scheduled_exit = None;
        self.current_tool = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolEffect {
    pub tool_name: String,
    pub agent_id: String,
    pub style: ToolStyle,
    pub phase: ToolPhase,
    pub rise_at: SimTime,
    pub expires_at: SimTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskMarker {
    pub subject: String,
    pub phase: MarkerPhase,
    pub settle_at: SimTime,
    pub completions: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ambient {
    pub species: AmbientSpecies,
    /// Offset into the bobbing cycle so creatures do not move in lockstep
    pub bob_offset: f32,
    pub base_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    PrimaryAgent(PrimaryAgent),
    ToolEffect(ToolEffect),
    TaskMarker(TaskMarker),
    Ambient(Ambient),
}

/// Time-driven transition reported by [`Entity::advance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    AgentActivated,
    AgentExiting(ExitVariant),
    AgentGone,
    ToolRising,
    ToolExpired,
    MarkerSettled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub motion: Motion,
    pub spawned_at: SimTime,
    pub last_event_at: SimTime,
    pub label: Option<Label>,
}

impl Entity {
    pub fn as_agent(&self) -> Option<&PrimaryAgent> {
        match &self.kind {
            EntityKind::PrimaryAgent(agent) => Some(agent),
            _ => None,
        }
    }

    pub fn as_agent_mut(&mut self) -> Option<&mut PrimaryAgent> {
        match &mut self.kind {
            EntityKind::PrimaryAgent(agent) => Some(agent),
            _ => None,
        }
    }

    /// Reached a state from which it is removed
    pub fn is_terminal(&self) -> bool {
        match &self.kind {
            EntityKind::PrimaryAgent(agent) => agent.phase == AgentPhase::Gone,
            EntityKind::ToolEffect(tool) => tool.phase == ToolPhase::Expired,
            EntityKind::TaskMarker(_) | EntityKind::Ambient(_) => false,
        }
    }

    /// Advance motion, timers, and label expiry by `dt` seconds ending at `now`
    pub fn advance(
        &mut self,
        dt: f64,
        now: SimTime,
        bounds: &Bounds,
        config: &SimulationConfig,
        rng: &mut impl Rng,
    ) -> Option<Transition> {
        if self.label.as_ref().is_some_and(|label| label.is_expired(now)) {
            self.label = None;
        }

        let step = dt as f32;
        let motion = &mut self.motion;
        match &mut self.kind {
            EntityKind::PrimaryAgent(agent) => advance_agent(agent, motion, step, now, bounds, config, rng),
            EntityKind::ToolEffect(tool) => advance_tool(tool, motion, step, now, bounds),
            EntityKind::TaskMarker(marker) => advance_marker(marker, motion, step, now, bounds),
            EntityKind::Ambient(ambient) => {
                advance_ambient(ambient, motion, step, now, bounds);
                None
            }
        }
    }
}

fn advance_agent(
    agent: &mut PrimaryAgent,
    motion: &mut Motion,
    step: f32,
    now: SimTime,
    bounds: &Bounds,
    config: &SimulationConfig,
    rng: &mut impl Rng,
) -> Option<Transition> {
    match agent.phase {
        AgentPhase::Entering => {
            motion.facing = Facing::Right;
            motion.step_x(step);
            if now - agent.phase_started >= config.entry_secs {
                agent.phase = AgentPhase::Active;
                agent.phase_started = now;
                return Some(Transition::AgentActivated);
            }
            None
        }
        AgentPhase::Active => {
            if let Some(variant) = agent.pending_exit {
                agent.begin_exit(variant, now);
                return Some(Transition::AgentExiting(variant));
            }
            if let Some(scheduled) = agent.scheduled_exit {
                if now >= scheduled.at {
                    agent.begin_exit(scheduled.variant, now);
                    return Some(Transition::AgentExiting(scheduled.variant));
                }
            }

            motion.step_x(step);
            motion.bounce(2.0, bounds.width - AGENT_WIDTH - 2.0);
            // About one spontaneous turn every few seconds
            if rng.gen_bool((0.3 * f64::from(step)).min(1.0)) {
                motion.facing = motion.facing.flipped();
            }
            motion.position.y = motion.position.y.clamp(bounds.ocean_top(), bounds.floor_row() - 1.0);
            None
        }
        AgentPhase::Exiting => {
            match agent.exit_variant {
                Some(ExitVariant::Error) => {
                    // Belly-up drift towards the surface
                    motion.position.y = (motion.position.y - 1.5 * step).max(bounds.ocean_top());
                    motion.position.x += motion.speed * 0.2 * step;
                }
                _ => {
                    motion.facing = Facing::Right;
                    motion.speed = motion.speed.max(12.0);
                    motion.step_x(step);
                }
            }
            if now - agent.phase_started >= config.exit_secs {
                agent.phase = AgentPhase::Gone;
                agent.phase_started = now;
                return Some(Transition::AgentGone);
            }
            None
        }
        AgentPhase::Gone => None,
    }
}

fn advance_tool(
    tool: &mut ToolEffect,
    motion: &mut Motion,
    step: f32,
    now: SimTime,
    bounds: &Bounds,
) -> Option<Transition> {
    if tool.phase == ToolPhase::Expired {
        return None;
    }
    if now >= tool.expires_at {
        tool.phase = ToolPhase::Expired;
        return Some(Transition::ToolExpired);
    }

    let mut transition = None;
    if tool.phase == ToolPhase::Spawned && now >= tool.rise_at {
        tool.phase = ToolPhase::Rising;
        transition = Some(Transition::ToolRising);
    }

    if tool.phase == ToolPhase::Rising {
        match tool.style {
            ToolStyle::Bubble => {
                motion.position.y = (motion.position.y - motion.speed * step).max(bounds.surface_row());
            }
            ToolStyle::Sailboat => {
                motion.step_x(step);
                motion.bounce(3.0, bounds.width - 14.0);
            }
            ToolStyle::Dolphin => {
                motion.step_x(step);
                motion.bounce(3.0, bounds.width - 15.0);
            }
            ToolStyle::Shrimp | ToolStyle::SmallFish => motion.step_x(step),
            ToolStyle::Crab => {
                motion.step_x(step);
                motion.position.y = bounds.floor_row();
            }
        }
    }
    transition
}

fn advance_marker(
    marker: &mut TaskMarker,
    motion: &mut Motion,
    step: f32,
    now: SimTime,
    bounds: &Bounds,
) -> Option<Transition> {
    let floor = bounds.floor_row();
    match marker.phase {
        MarkerPhase::Spawned => {
            motion.position.y = (motion.position.y + motion.speed * step).min(floor);
            if now >= marker.settle_at {
                motion.position.y = floor;
                marker.phase = MarkerPhase::Settled;
                return Some(Transition::MarkerSettled);
            }
            None
        }
        MarkerPhase::Settled => {
            motion.position.y = floor;
            None
        }
    }
}

fn advance_ambient(ambient: &mut Ambient, motion: &mut Motion, step: f32, now: SimTime, bounds: &Bounds) {
    motion.step_x(step);
    match ambient.species {
        AmbientSpecies::Jellyfish => {
            let bob = ((now as f32) * 1.0 + ambient.bob_offset).sin() * 0.6;
            motion.position.y = (ambient.base_y + bob).clamp(bounds.ocean_top(), bounds.floor_row() - 3.0);
            motion.wrap(bounds.width, 5.0);
        }
        AmbientSpecies::Fish => motion.wrap(bounds.width, 4.0),
        AmbientSpecies::Bird => motion.wrap(bounds.width, 3.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn agent_entity(phase: AgentPhase) -> Entity {
        Entity {
            id: EntityId(1),
            kind: EntityKind::PrimaryAgent(PrimaryAgent {
                agent_id: "a1".into(),
                agent_type: None,
                title: "a1".into(),
                phase,
                phase_started: 0.0,
                exit_variant: None,
                pending_exit: None,
                scheduled_exit: None,
                orphan: false,
                resident: false,
                last_stop_at: None,
                tool_calls: 0,
                current_tool: None,
            }),
            motion: Motion::new(Vec2::new(-5.0, 10.0), 6.0, Facing::Right),
            spawned_at: 0.0,
            last_event_at: 0.0,
            label: None,
        }
    }

    fn step(entity: &mut Entity, from: f64, to: f64, dt: f64) -> Vec<Transition> {
        let config = SimulationConfig::default();
        let bounds = Bounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut out = Vec::new();
        let mut now = from;
        while now < to - 1e-9 {
            now += dt;
            out.extend(entity.advance(dt, now, &bounds, &config, &mut rng));
        }
        out
    }

    #[test]
    fn test_tool_style_from_name() {
        assert_eq!(ToolStyle::from_tool_name("Read"), ToolStyle::Bubble);
        assert_eq!(ToolStyle::from_tool_name("mcp__codex__codex"), ToolStyle::Sailboat);
        assert_eq!(ToolStyle::from_tool_name("mcp__notion__search"), ToolStyle::Dolphin);
    }

    #[test]
    fn test_label_fades_in_last_stretch() {
        let label = Label::new("Read: main.rs", 0.0, 10.0);
        assert_eq!(label.opacity(5.0), 1.0);
        assert!((label.opacity(8.5) - 0.5).abs() < 1e-6);
        assert_eq!(label.opacity(10.0), 0.0);
        assert!(label.is_expired(10.0));
    }

    #[test]
    fn test_label_text_is_truncated() {
        let label = Label::new(&"x".repeat(80), 0.0, 1.0);
        assert_eq!(label.text.chars().count(), LABEL_MAX_CHARS);
    }

    #[test]
    fn test_entering_becomes_active_after_entry_time() {
        let mut entity = agent_entity(AgentPhase::Entering);
        let x0 = entity.motion.position.x;
        let transitions = step(&mut entity, 0.0, 1.55, 0.05);
        assert_eq!(transitions, vec![Transition::AgentActivated]);
        assert_eq!(entity.as_agent().unwrap().phase, AgentPhase::Active);
        assert!(entity.motion.position.x > x0);
    }

    #[test]
    fn test_pending_exit_applies_after_one_active_tick() {
        let mut entity = agent_entity(AgentPhase::Entering);
        entity.as_agent_mut().unwrap().pending_exit = Some(ExitVariant::Error);
        let transitions = step(&mut entity, 0.0, 1.65, 0.05);
        assert_eq!(
            transitions,
            vec![Transition::AgentActivated, Transition::AgentExiting(ExitVariant::Error)]
        );
    }

    #[test]
    fn test_exiting_ends_gone() {
        let mut entity = agent_entity(AgentPhase::Active);
        entity.as_agent_mut().unwrap().begin_exit(ExitVariant::Normal, 0.0);
        let transitions = step(&mut entity, 0.0, 3.05, 0.05);
        assert_eq!(transitions, vec![Transition::AgentGone]);
        assert!(entity.is_terminal());
    }

    #[test]
    fn test_expired_label_is_cleared() {
        let mut entity = agent_entity(AgentPhase::Active);
        entity.label = Some(Label::new("Bash", 0.0, 0.1));
        step(&mut entity, 0.0, 0.2, 0.05);
        assert!(entity.label.is_none());
    }

    #[test]
    fn test_tool_effect_lifecycle() {
        let mut entity = Entity {
            id: EntityId(2),
            kind: EntityKind::ToolEffect(ToolEffect {
                tool_name: "Read".into(),
                agent_id: "a1".into(),
                style: ToolStyle::Bubble,
                phase: ToolPhase::Spawned,
                rise_at: 0.2,
                expires_at: 1.5,
            }),
            motion: Motion::new(Vec2::new(10.0, 20.0), 4.0, Facing::Right),
            spawned_at: 0.0,
            last_event_at: 0.0,
            label: None,
        };
        let transitions = step(&mut entity, 0.0, 1.55, 0.05);
        assert_eq!(transitions, vec![Transition::ToolRising, Transition::ToolExpired]);
        assert!(entity.motion.position.y < 20.0);
        assert!(entity.is_terminal());
    }

    #[test]
    fn test_crab_walks_the_floor() {
        let bounds = Bounds::default();
        let mut entity = Entity {
            id: EntityId(4),
            kind: EntityKind::ToolEffect(ToolEffect {
                tool_name: "Grep".into(),
                agent_id: "a1".into(),
                style: ToolStyle::Crab,
                phase: ToolPhase::Spawned,
                rise_at: 0.2,
                expires_at: 3.75,
            }),
            motion: Motion::new(Vec2::new(10.0, bounds.floor_row()), 3.0, Facing::Left),
            spawned_at: 0.0,
            last_event_at: 0.0,
            label: None,
        };
        step(&mut entity, 0.0, 1.0, 0.05);
        assert!(entity.motion.position.x < 10.0);
        assert_eq!(entity.motion.position.y, bounds.floor_row());
        assert!(ToolStyle::Crab.is_companion());
        assert!(!ToolStyle::Dolphin.is_companion());
    }

    #[test]
    fn test_marker_settles_on_floor() {
        let bounds = Bounds::default();
        let mut entity = Entity {
            id: EntityId(3),
            kind: EntityKind::TaskMarker(TaskMarker {
                subject: "Fix auth".into(),
                phase: MarkerPhase::Spawned,
                settle_at: 1.0,
                completions: 1,
            }),
            motion: Motion::new(Vec2::new(10.0, bounds.ocean_top()), 20.0, Facing::Right),
            spawned_at: 0.0,
            last_event_at: 0.0,
            label: None,
        };
        let transitions = step(&mut entity, 0.0, 2.0, 0.05);
        assert_eq!(transitions, vec![Transition::MarkerSettled]);
        assert_eq!(entity.motion.position.y, bounds.floor_row());
        assert!(!entity.is_terminal());
    }

    #[test]
    fn test_ambient_wraps_around() {
        let mut motion = Motion::new(Vec2::new(104.5, 3.0), 1.0, Facing::Right);
        motion.wrap(100.0, 4.0);
        assert_eq!(motion.position.x, -4.0);
    }
}
