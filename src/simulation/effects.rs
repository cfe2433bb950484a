//! Transient effects - particle bursts, alerts and banners
//!
//! Effects are spawned by entity transitions and milestones, then evolve on
//! their own until their TTL runs out. They never interact with each other.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{EffectId, SimTime, Vec2};

/// Downward acceleration for falling particles (cells/s²)
const GRAVITY: f32 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstTone {
    /// Rising bubbles from an agent that finished cleanly
    Bubbles,
    /// Scattering debris from an agent that failed
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    Burst { tone: BurstTone },
    Alert { message: String },
    Splash,
    Sparkle,
    Milestone { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub glyph: char,
    /// Affected by gravity
    pub falls: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: EffectId,
    pub kind: EffectKind,
    pub origin: Vec2,
    pub created_at: SimTime,
    pub ttl: f64,
    pub particles: Vec<Particle>,
}

impl Effect {
    pub fn age(&self, now: SimTime) -> f64 {
        (now - self.created_at).max(0.0)
    }

    /// Fraction of the lifetime used (0.0 - 1.0)
    pub fn progress(&self, now: SimTime) -> f32 {
        (self.age(now) / self.ttl).clamp(0.0, 1.0) as f32
    }

    pub fn is_expired(&self, now: SimTime) -> bool {
        self.age(now) >= self.ttl
    }

    pub fn is_milestone(&self) -> bool {
        matches!(self.kind, EffectKind::Milestone { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Effects {
    active: Vec<Effect>,
    next_id: u64,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(
        &mut self,
        kind: EffectKind,
        origin: Vec2,
        now: SimTime,
        ttl: f64,
        rng: &mut impl Rng,
    ) -> EffectId {
        self.next_id += 1;
        let id = EffectId(self.next_id);
        let particles = particles_for(&kind, origin, rng);
        self.active.push(Effect {
            id,
            kind,
            origin,
            created_at: now,
            ttl,
            particles,
        });
        id
    }

    /// Move particles and drop expired effects; returns how many were removed
    pub fn advance(&mut self, dt: f64, now: SimTime) -> usize {
        let step = dt as f32;
        for effect in &mut self.active {
            for particle in &mut effect.particles {
                if particle.falls {
                    particle.velocity.y += GRAVITY * step;
                }
                particle.position = particle.position + particle.velocity * step;
            }
        }
        let before = self.active.len();
        self.active.retain(|effect| !effect.is_expired(now));
        before - self.active.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn milestone_count(&self) -> usize {
        self.active.iter().filter(|e| e.is_milestone()).count()
    }
}

fn particles_for(kind: &EffectKind, origin: Vec2, rng: &mut impl Rng) -> Vec<Particle> {
    match kind {
        EffectKind::Burst { tone: BurstTone::Bubbles } => {
            spray(rng, origin, 6, &['o', 'O', '°', '.'], 1.5, (-5.0, -2.0), false)
        }
        EffectKind::Burst { tone: BurstTone::Error } => {
            spray(rng, origin, 8, &['x', '*', '#'], 6.0, (-6.0, -1.0), true)
        }
        EffectKind::Splash => spray(rng, origin, 5, &['~', '.', '\''], 4.0, (-5.0, -3.0), true),
        EffectKind::Sparkle => spray(rng, origin, 4, &['*', '+'], 2.0, (-1.0, 1.0), false),
        EffectKind::Milestone { .. } => {
            spray(rng, origin, 16, &['*', '+', 'o', '~'], 10.0, (-8.0, -2.0), true)
        }
        EffectKind::Alert { .. } => Vec::new(),
    }
}

fn spray(
    rng: &mut impl Rng,
    origin: Vec2,
    count: usize,
    glyphs: &[char],
    spread_x: f32,
    rise: (f32, f32),
    falls: bool,
) -> Vec<Particle> {
    (0..count)
        .map(|i| Particle {
            position: origin,
            velocity: Vec2::new(rng.gen_range(-spread_x..=spread_x), rng.gen_range(rise.0..=rise.1)),
            glyph: glyphs[i % glyphs.len()],
            falls,
        })
        .collect()
}
