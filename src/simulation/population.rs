//! Ambient population - background creatures that follow agent activity
//!
//! The target grows with the number of active agents and with every fired
//! milestone. Growth is gradual (one creature per successful roll); shrinking
//! removes the oldest creature once the population is more than one over.

use rand::Rng;

use super::entity::AmbientSpecies;
use super::registry::{Registry, StepContext};
use crate::core::types::EntityId;
use crate::core::SimulationConfig;

/// What one regulation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationChange {
    pub spawned: Vec<EntityId>,
    pub despawned: Vec<EntityId>,
}

/// Desired ambient count for the current activity level
pub fn desired_ambient(config: &SimulationConfig, active_agents: usize, milestone_bonus: usize) -> usize {
    let from_agents = (active_agents as f32 * config.ambient_per_agent).floor() as usize;
    (config.ambient_min + from_agents + milestone_bonus).min(config.ambient_max)
}

/// Pick a species; birds only fly in daylight
pub fn pick_species(rng: &mut impl Rng, is_night: bool) -> AmbientSpecies {
    let roll = rng.gen_range(0..100);
    match roll {
        0..=29 => AmbientSpecies::Jellyfish,
        30..=79 => AmbientSpecies::Fish,
        _ if is_night => AmbientSpecies::Fish,
        _ => AmbientSpecies::Bird,
    }
}

/// Fill the initial population up to `ambient_min`
pub fn seed_ambient(registry: &mut Registry, ctx: &mut StepContext<'_>, is_night: bool) -> Vec<EntityId> {
    let mut spawned = Vec::with_capacity(ctx.config.ambient_min);
    for _ in 0..ctx.config.ambient_min {
        let species = pick_species(&mut *ctx.rng, is_night);
        spawned.push(registry.spawn_ambient(species, ctx));
    }
    spawned
}

/// One regulation pass, run once per tick
pub fn regulate(
    registry: &mut Registry,
    ctx: &mut StepContext<'_>,
    desired: usize,
    is_night: bool,
) -> PopulationChange {
    let mut change = PopulationChange::default();
    let mut ambient = registry.ambient_ids();

    if is_night {
        for (id, _) in ambient.iter().filter(|(_, species)| species.lives_in_sky()) {
            if registry.despawn_ambient(*id) {
                change.despawned.push(*id);
            }
        }
        ambient.retain(|(_, species)| !species.lives_in_sky());
    }

    let count = ambient.len();
    if count < desired {
        if ctx.rng.gen_bool(ctx.config.ambient_spawn_chance) {
            let species = pick_species(&mut *ctx.rng, is_night);
            change.spawned.push(registry.spawn_ambient(species, ctx));
        }
    } else if count > desired + 1 {
        // Ids are allocated in order, so the first is the oldest
        if let Some((oldest, _)) = ambient.first() {
            if registry.despawn_ambient(*oldest) {
                change.despawned.push(*oldest);
            }
        }
    }

    change
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Bounds;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx<'a>(config: &'a SimulationConfig, rng: &'a mut ChaCha8Rng) -> StepContext<'a> {
        StepContext {
            now: 0.0,
            dt: config.tick_dt(),
            bounds: Bounds::default(),
            config,
            rng,
        }
    }

    #[test]
    fn test_desired_grows_and_caps() {
        let config = SimulationConfig::default();
        assert_eq!(desired_ambient(&config, 0, 0), 5);
        assert_eq!(desired_ambient(&config, 4, 0), 7);
        assert_eq!(desired_ambient(&config, 4, 3), 10);
        assert_eq!(desired_ambient(&config, 100, 0), config.ambient_max);
    }

    #[test]
    fn test_no_birds_at_night() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..500 {
            assert_ne!(pick_species(&mut rng, true), AmbientSpecies::Bird);
        }
    }

    #[test]
    fn test_seed_fills_minimum() {
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut registry = Registry::new();
        let seeded = seed_ambient(&mut registry, &mut ctx(&config, &mut rng), false);
        assert_eq!(seeded.len(), config.ambient_min);
        assert_eq!(registry.ambient_ids().len(), config.ambient_min);
    }

    #[test]
    fn test_grows_toward_target() {
        let config = SimulationConfig {
            ambient_spawn_chance: 1.0,
            ..SimulationConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut registry = Registry::new();
        for _ in 0..20 {
            regulate(&mut registry, &mut ctx(&config, &mut rng), 4, true);
        }
        assert_eq!(registry.ambient_ids().len(), 4);
    }

    #[test]
    fn test_shrinks_oldest_first() {
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut registry = Registry::new();
        let ids: Vec<EntityId> = (0..8)
            .map(|_| registry.spawn_ambient(AmbientSpecies::Fish, &mut ctx(&config, &mut rng)))
            .collect();

        let change = regulate(&mut registry, &mut ctx(&config, &mut rng), 5, false);
        assert_eq!(change.despawned, vec![ids[0]]);

        // Within one of the target nothing is removed
        regulate(&mut registry, &mut ctx(&config, &mut rng), 5, false);
        let change = regulate(&mut registry, &mut ctx(&config, &mut rng), 5, false);
        assert!(change.despawned.is_empty());
        assert_eq!(registry.ambient_ids().len(), 6);
    }

    #[test]
    fn test_birds_leave_at_night() {
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut registry = Registry::new();
        registry.spawn_ambient(AmbientSpecies::Bird, &mut ctx(&config, &mut rng));
        registry.spawn_ambient(AmbientSpecies::Fish, &mut ctx(&config, &mut rng));

        let change = regulate(&mut registry, &mut ctx(&config, &mut rng), 5, true);
        assert_eq!(change.despawned.len(), 1);
        assert!(registry
            .ambient_ids()
            .iter()
            .all(|(_, species)| !species.lives_in_sky()));
    }
}
