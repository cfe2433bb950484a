//! Tick system - the single writer of all simulation state
//!
//! Each tick runs the same ordered pipeline:
//! drain events -> sample environment -> advance entities -> advance effects
//! -> milestones and ambient population -> snapshot.
//!
//! Simulation time is `tick * dt`; wall time only feeds the environment,
//! uptime and log timestamps.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};

use super::effects::{BurstTone, EffectKind, Effects};
use super::entity::{AgentPhase, ExitVariant};
use super::environment::{EnvironmentClock, EnvironmentState};
use super::log::{EventLog, LogCategory};
use super::milestones::MilestoneTracker;
use super::population::{desired_ambient, regulate, seed_ambient};
use super::registry::{Outcome, Registry, StepContext};
use super::snapshot::{EntityView, Snapshot};
use super::stats::SessionStats;
use crate::core::types::{Bounds, SimTime, Tick, Vec2};
use crate::core::{EnvironmentConfig, Result, SimulationConfig, WallClock};
use crate::event::{Event, EventKind, MAIN_AGENT_ID};
use crate::ingest::{IngestStats, TransferQueue};

pub struct Simulation {
    config: SimulationConfig,
    registry: Registry,
    stats: SessionStats,
    log: EventLog,
    effects: Effects,
    environment: EnvironmentClock,
    milestones: MilestoneTracker,
    /// Extra ambient target earned by fired milestones
    milestone_bonus: usize,
    clock: Box<dyn WallClock>,
    rng: ChaCha8Rng,
    bounds: Bounds,
    tick: Tick,
    ambient_seeded: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig, environment: EnvironmentConfig, clock: Box<dyn WallClock>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let session_start = clock.unix_secs();
        let mut sim = Self {
            log: EventLog::new(config.log_capacity),
            milestones: MilestoneTracker::new(&config),
            config,
            registry: Registry::new(),
            stats: SessionStats::new(session_start),
            effects: Effects::new(),
            environment: EnvironmentClock::new(environment),
            milestone_bonus: 0,
            clock,
            rng,
            bounds: Bounds::default(),
            tick: 0,
            ambient_seeded: false,
        };
        if sim.config.main_agent {
            let mut ctx = StepContext {
                now: 0.0,
                dt: sim.config.tick_dt(),
                bounds: sim.bounds,
                config: &sim.config,
                rng: &mut sim.rng,
            };
            sim.registry.spawn_resident(MAIN_AGENT_ID, "main session", &mut ctx);
        }
        sim
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self.registry.clamp_to(&bounds);
        self
    }

    /// Adopt a new drawable area, pulling entities back inside it
    pub fn resize(&mut self, bounds: Bounds) {
        if bounds != self.bounds {
            debug!(width = bounds.width, height = bounds.height, "Simulation resized");
            self.bounds = bounds;
            self.registry.clamp_to(&bounds);
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn tick_count(&self) -> Tick {
        self.tick
    }

    pub fn sim_time(&self) -> SimTime {
        self.tick as f64 * self.config.tick_dt()
    }

    /// Drain the queue and run one tick
    pub fn tick(&mut self, queue: &TransferQueue, ingest: IngestStats) -> Result<Arc<Snapshot>> {
        let events = queue.drain();
        self.step(events, ingest, queue.dropped())
    }

    /// Run one tick over an already-drained batch of events
    pub fn step(&mut self, events: Vec<Event>, ingest: IngestStats, queue_dropped: u64) -> Result<Arc<Snapshot>> {
        self.tick += 1;
        let dt = self.config.tick_dt();
        let now = self.sim_time();

        // 1. Events, in arrival order
        let event_count = events.len();
        for event in &events {
            self.apply_event(event, now);
        }

        // 2. Environment
        let environment = self.environment.sample(self.clock.now());

        // 3. Entities
        let outcomes = {
            let mut ctx = StepContext {
                now,
                dt,
                bounds: self.bounds,
                config: &self.config,
                rng: &mut self.rng,
            };
            self.registry.advance(&mut ctx)
        };
        for outcome in &outcomes {
            self.react(outcome, now);
        }

        // 4. Effects
        self.effects.advance(dt, now);

        // 5. Milestones, then the ambient population they feed
        self.evaluate_milestones(now);
        self.regulate_ambient(now, &environment);

        self.registry.check_invariants()?;
        if event_count > 0 {
            trace!(tick = self.tick, events = event_count, entities = self.registry.len(), "Tick applied events");
        }
        Ok(Arc::new(self.snapshot(now, environment, ingest, queue_dropped)))
    }

    fn apply_event(&mut self, event: &Event, now: SimTime) {
        let outcomes = {
            let mut ctx = StepContext {
                now,
                dt: self.config.tick_dt(),
                bounds: self.bounds,
                config: &self.config,
                rng: &mut self.rng,
            };
            self.registry.apply(event, &mut ctx)
        };

        for outcome in &outcomes {
            match outcome {
                Outcome::AgentEntered { agent_id, .. } => {
                    self.stats.record_agent(agent_id);
                }
                Outcome::OrphanSynthesized { agent_id, .. } => {
                    self.stats.record_agent(agent_id);
                    self.stats.record_orphan();
                    let detail = format!("{}: no start seen", agent_id);
                    self.log.push(event.timestamp(), LogCategory::Orphan, &detail);
                }
                _ => {}
            }
            self.react(outcome, now);
        }

        if event.kind() == EventKind::ToolError {
            let origin = self
                .registry
                .agent(event.agent_id())
                .map(|e| e.motion.position)
                .unwrap_or_else(|| self.center());
            let message = format!("{} failed", event.tool_name().unwrap_or("tool"));
            self.effects.spawn(
                EffectKind::Alert { message },
                origin,
                now,
                self.config.alert_ttl_secs,
                &mut self.rng,
            );
        }

        self.stats.record_event(event);
        self.log.record(event);
    }

    /// Spawn the effects an outcome calls for
    fn react(&mut self, outcome: &Outcome, now: SimTime) {
        let cfg = &self.config;
        match outcome {
            Outcome::AgentEntered { position, .. } | Outcome::OrphanSynthesized { position, .. } => {
                let origin = Vec2::new(position.x.max(2.0), self.bounds.ocean_top());
                self.effects.spawn(EffectKind::Splash, origin, now, cfg.burst_ttl_secs, &mut self.rng);
            }
            Outcome::AgentExiting {
                variant,
                position,
                title,
                ..
            } => {
                let tone = match variant {
                    ExitVariant::Normal => BurstTone::Bubbles,
                    ExitVariant::Error => BurstTone::Error,
                };
                self.effects
                    .spawn(EffectKind::Burst { tone }, *position, now, cfg.burst_ttl_secs, &mut self.rng);
                if *variant == ExitVariant::Error {
                    let message = format!("{} errored", title);
                    self.effects
                        .spawn(EffectKind::Alert { message }, *position, now, cfg.alert_ttl_secs, &mut self.rng);
                }
            }
            Outcome::MarkerPlaced { position, .. } => {
                self.effects.spawn(EffectKind::Sparkle, *position, now, cfg.burst_ttl_secs, &mut self.rng);
            }
            Outcome::AgentGone { agent_id, .. } => {
                debug!(agent_id = agent_id.as_str(), "Agent left the tank");
            }
            _ => {}
        }
    }

    fn evaluate_milestones(&mut self, now: SimTime) {
        for milestone in self.milestones.evaluate(&self.stats) {
            info!(kind = ?milestone.kind, threshold = milestone.threshold, "Milestone reached");
            let origin = self.center();
            self.effects.spawn(
                EffectKind::Milestone {
                    message: milestone.message.clone(),
                },
                origin,
                now,
                self.config.milestone_ttl_secs,
                &mut self.rng,
            );
            self.log
                .push(self.clock.unix_secs(), LogCategory::Milestone, &milestone.message);
            self.stats.milestones_fired += 1;
            self.milestone_bonus += self.config.milestone_ambient_bonus;
        }
    }

    fn regulate_ambient(&mut self, now: SimTime, environment: &EnvironmentState) {
        let active = self.active_agents();
        let desired = desired_ambient(&self.config, active, self.milestone_bonus);
        let mut ctx = StepContext {
            now,
            dt: self.config.tick_dt(),
            bounds: self.bounds,
            config: &self.config,
            rng: &mut self.rng,
        };
        if !self.ambient_seeded {
            self.ambient_seeded = true;
            seed_ambient(&mut self.registry, &mut ctx, environment.is_night);
        }
        regulate(&mut self.registry, &mut ctx, desired, environment.is_night);
    }

    fn active_agents(&self) -> usize {
        self.registry
            .agent_count_in(&[AgentPhase::Entering, AgentPhase::Active])
    }

    fn center(&self) -> Vec2 {
        Vec2::new(self.bounds.width / 2.0, self.bounds.ocean_mid())
    }

    fn snapshot(
        &self,
        now: SimTime,
        environment: EnvironmentState,
        ingest: IngestStats,
        queue_dropped: u64,
    ) -> Snapshot {
        Snapshot {
            tick: self.tick,
            sim_time: now,
            bounds: self.bounds,
            entities: self
                .registry
                .iter()
                .map(|e| EntityView::from_entity(e, now, &self.config))
                .collect(),
            effects: self.effects.iter().cloned().collect(),
            environment,
            stats: self
                .stats
                .view(self.active_agents() as u64, self.clock.unix_secs()),
            ingest,
            queue_dropped,
            log: self.log.recent(self.config.snapshot_log_entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use crate::simulation::snapshot::EntityViewKind;
    use chrono::NaiveDate;

    fn quiet_config() -> SimulationConfig {
        SimulationConfig {
            rng_seed: Some(42),
            ambient_min: 0,
            ambient_max: 0,
            main_agent: false,
            ..SimulationConfig::default()
        }
    }

    fn sim(config: SimulationConfig) -> Simulation {
        let noon = NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        Simulation::new(config, EnvironmentConfig::default(), Box::new(ManualClock::new(noon)))
    }

    fn step(sim: &mut Simulation, events: Vec<Event>) -> Arc<Snapshot> {
        sim.step(events, IngestStats::default(), 0).unwrap()
    }

    #[test]
    fn test_empty_tick_advances_time_only() {
        let mut sim = sim(quiet_config());
        let first = step(&mut sim, Vec::new());
        let second = step(&mut sim, Vec::new());
        assert_eq!(second.tick, first.tick + 1);
        assert!((second.sim_time - first.sim_time - sim.config().tick_dt()).abs() < 1e-12);
        assert!(second.entities.is_empty());
        assert_eq!(second.stats.events_seen, 0);
    }

    #[test]
    fn test_start_then_stop_round_trip() {
        let mut sim = sim(quiet_config());
        let snap = step(&mut sim, vec![Event::agent_start("a1", 0.0)]);
        let agent = snap.find_agent("a1").unwrap();
        assert_eq!(agent.agent_phase(), Some(AgentPhase::Entering));
        assert_eq!(snap.stats.agent_count, 1);

        // Stop arrives mid-entry; the agent still becomes active first
        step(&mut sim, vec![Event::agent_stop("a1", 0.1, false)]);
        let mut saw_active = false;
        let mut saw_exiting = false;
        for _ in 0..200 {
            let snap = step(&mut sim, Vec::new());
            match snap.find_agent("a1").and_then(|e| e.agent_phase()) {
                Some(AgentPhase::Active) => saw_active = true,
                Some(AgentPhase::Exiting) => saw_exiting = true,
                _ => {}
            }
        }
        assert!(saw_active);
        assert!(saw_exiting);
        assert!(sim.registry().agent("a1").is_none());
        assert_eq!(sim.registry().activated_total(), 1);
    }

    #[test]
    fn test_orphan_tool_start_is_logged() {
        let mut sim = sim(quiet_config());
        let snap = step(&mut sim, vec![Event::tool_start("ghost", "Read", 0.0)]);
        let agent = snap.find_agent("ghost").unwrap();
        assert_eq!(agent.agent_phase(), Some(AgentPhase::Active));
        assert!(matches!(agent.kind, EntityViewKind::Agent { orphan: true, .. }));
        assert_eq!(snap.stats.orphan_count, 1);
        assert!(snap.log.iter().any(|e| e.category == LogCategory::Orphan));
    }

    #[test]
    fn test_main_session_is_placed_once() {
        let config = SimulationConfig {
            main_agent: true,
            ..quiet_config()
        };
        let mut sim = sim(config);
        assert!(sim.registry().agent(MAIN_AGENT_ID).is_some());

        let per_burst = (40.0 / sim.config().tick_dt()) as usize;
        let mut snap = step(&mut sim, Vec::new());
        for burst in 0..3 {
            let at = burst as f64 * 40.0;
            snap = step(&mut sim, vec![Event::tool_start(MAIN_AGENT_ID, "Read", at)]);
            for _ in 0..per_burst {
                snap = step(&mut sim, Vec::new());
            }
        }

        let mains: Vec<_> = snap
            .entities
            .iter()
            .filter(|e| e.agent_id() == Some(MAIN_AGENT_ID))
            .collect();
        assert_eq!(mains.len(), 1);
        assert_eq!(mains[0].agent_phase(), Some(AgentPhase::Active));
        assert!(matches!(mains[0].kind, EntityViewKind::Agent { orphan: false, .. }));
        assert_eq!(snap.stats.orphan_count, 0);
        assert!(snap.log.iter().all(|e| e.category != LogCategory::Orphan));
    }

    #[test]
    fn test_tool_error_raises_alert() {
        let mut sim = sim(quiet_config());
        step(&mut sim, vec![Event::agent_start("a1", 0.0)]);
        let snap = step(&mut sim, vec![Event::tool_error("a1", "Bash", 0.1)]);
        assert!(snap
            .effects
            .iter()
            .any(|e| matches!(&e.kind, EffectKind::Alert { message } if message == "Bash failed")));
        assert_eq!(snap.stats.error_count, 1);
    }

    #[test]
    fn test_milestone_fires_once() {
        let mut sim = sim(quiet_config());
        let events: Vec<Event> = (0..25)
            .map(|i| Event::tool_start("a1", "Read", i as f64))
            .collect();
        let snap = step(&mut sim, events);
        assert_eq!(snap.stats.milestones_fired, 1);
        let banners = snap.effects.iter().filter(|e| e.is_milestone()).count();
        assert_eq!(banners, 1);

        let snap = step(&mut sim, vec![Event::tool_start("a1", "Read", 30.0)]);
        assert_eq!(snap.stats.milestones_fired, 1);
    }

    #[test]
    fn test_ambient_seeded_and_regulated() {
        let config = SimulationConfig {
            rng_seed: Some(3),
            ..SimulationConfig::default()
        };
        let min = config.ambient_min;
        let max = config.ambient_max;
        let mut sim = sim(config);
        for _ in 0..100 {
            let snap = step(&mut sim, Vec::new());
            let ambient = snap
                .entities
                .iter()
                .filter(|e| matches!(e.kind, EntityViewKind::Ambient { .. }))
                .count();
            assert!(ambient >= min && ambient <= max);
        }
    }

    #[test]
    fn test_resize_clamps_entities() {
        let mut sim = sim(quiet_config());
        step(&mut sim, vec![Event::task_completed("Fix auth", 0.0)]);
        for _ in 0..40 {
            step(&mut sim, Vec::new());
        }
        let small = Bounds::new(40.0, 15.0);
        sim.resize(small);
        let snap = step(&mut sim, Vec::new());
        let marker = snap
            .entities
            .iter()
            .find(|e| matches!(e.kind, EntityViewKind::Marker { .. }))
            .unwrap();
        assert!(marker.position.y <= small.floor_row());
        assert!(marker.position.x <= small.width);
    }
}
