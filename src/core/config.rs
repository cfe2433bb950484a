//! Runtime configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their purpose
//! and how they interact with each other. Every field has a default, so a
//! TOML file only needs to name what it changes:
//!
//! ```toml
//! [ingest]
//! socket_path = "/tmp/tidepool.sock"
//! queue_capacity = 500
//!
//! [simulation]
//! tick_rate_hz = 20.0
//! tool_milestones = [20, 100, 500]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TidepoolError};

/// Default socket path the hook sender and the viewer agree on
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/tidepool.sock";

/// Environment variable that overrides the socket path
pub const SOCKET_ENV_VAR: &str = "TIDEPOOL_SOCK";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TidepoolConfig {
    pub ingest: IngestConfig,
    pub simulation: SimulationConfig,
    pub environment: EnvironmentConfig,
}

/// Configuration for the ingestion boundary and transfer queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Unix socket the producer connects to
    pub socket_path: PathBuf,

    /// Maximum events held between two ticks
    ///
    /// At 20 ticks/second the queue is drained every 50ms, so 500 entries
    /// absorbs bursts of 10,000 events/second before the oldest are evicted.
    pub queue_capacity: usize,

    /// Read timeout per connection (milliseconds)
    ///
    /// Not an idle timeout: a silent producer stays connected. The timeout
    /// only bounds how long a reader goes without checking for shutdown.
    pub read_timeout_ms: u64,

    /// Longest accepted message line (bytes)
    ///
    /// A peer that exceeds it is counted as a decode error and disconnected.
    pub max_message_bytes: usize,

    /// Grace period for in-flight connections during shutdown (milliseconds)
    pub shutdown_grace_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            queue_capacity: 500,
            read_timeout_ms: 250,
            max_message_bytes: 64 * 1024,
            shutdown_grace_ms: 2000,
        }
    }
}

/// Configuration for the simulation tick and entity lifecycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === TICK ===
    /// Target ticks per second
    ///
    /// Each tick advances simulation time by exactly `1 / tick_rate_hz`
    /// seconds, independent of how long the frame actually took.
    pub tick_rate_hz: f64,

    /// Seed for the simulation RNG (None = seeded from entropy)
    pub rng_seed: Option<u64>,

    // === PRIMARY AGENTS ===
    /// Duration of the entry animation (seconds)
    ///
    /// An agent stays `Entering` this long before becoming `Active`.
    pub entry_secs: f64,

    /// Duration of the exit animation (seconds)
    ///
    /// An `Exiting` agent is removed from the registry after this long.
    pub exit_secs: f64,

    /// How long an orphaned agent lingers after its last event (seconds)
    ///
    /// Orphans are agents we only know from activity (no start seen). With
    /// no stop ever coming, they leave on their own after this quiet period.
    pub orphan_linger_secs: f64,

    /// How long an agent synthesized from an orphaned stop stays visible (seconds)
    pub orphan_stop_linger_secs: f64,

    /// Keep a creature for the main session on screen all session
    ///
    /// Activity without an agent id belongs to the main session. With this
    /// off, the main session is treated like any other orphan.
    pub main_agent: bool,

    /// How long a tool label stays above an agent (seconds)
    ///
    /// The label fades during the last 30% of this window.
    pub label_ttl_secs: f64,

    // === TOOL EFFECTS AND MARKERS ===
    /// Lifetime of a tool effect (seconds)
    pub tool_effect_ttl_secs: f64,

    /// Time a tool effect spends in `Spawned` before it starts rising (seconds)
    pub tool_effect_spawn_secs: f64,

    /// Chance that a sub-agent tool call also brings a companion creature
    /// (shrimp, small fish or crab)
    pub tool_creature_chance: f64,

    /// Time a task marker takes to settle onto the floor (seconds)
    pub marker_settle_secs: f64,

    // === AMBIENT POPULATION ===
    /// Ambient creatures present with no agents around
    pub ambient_min: usize,

    /// Hard cap on ambient creatures
    pub ambient_max: usize,

    /// Extra ambient creatures per active agent
    ///
    /// At 0.5, every two busy agents attract one more creature.
    pub ambient_per_agent: f32,

    /// Per-tick chance of spawning one creature while under target
    ///
    /// Keeps growth gradual; at 20 ticks/second, 0.05 averages one
    /// creature per second.
    pub ambient_spawn_chance: f64,

    /// Extra ambient target granted by each fired milestone
    pub milestone_ambient_bonus: usize,

    // === MILESTONES ===
    /// Cumulative tool-call counts that trigger a celebration
    pub tool_milestones: Vec<u64>,

    /// Distinct agent counts that trigger a celebration
    pub agent_milestones: Vec<u64>,

    // === EFFECTS ===
    /// Lifetime of particle bursts (seconds)
    pub burst_ttl_secs: f64,

    /// Lifetime of alert markers (seconds)
    pub alert_ttl_secs: f64,

    /// Lifetime of milestone banners (seconds)
    pub milestone_ttl_secs: f64,

    // === EVENT LOG ===
    /// Entries kept in the event log
    pub log_capacity: usize,

    /// Most recent entries copied into each snapshot
    pub snapshot_log_entries: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20.0,
            rng_seed: None,

            entry_secs: 1.5,
            exit_secs: 3.0,
            orphan_linger_secs: 30.0,
            orphan_stop_linger_secs: 1.0,
            main_agent: true,
            label_ttl_secs: 10.0,

            tool_effect_ttl_secs: 1.5,
            tool_effect_spawn_secs: 0.2,
            tool_creature_chance: 0.3,
            marker_settle_secs: 1.0,

            ambient_min: 5,
            ambient_max: 16,
            ambient_per_agent: 0.5,
            ambient_spawn_chance: 0.05,
            milestone_ambient_bonus: 3,

            tool_milestones: vec![20, 100, 500],
            agent_milestones: vec![10],

            burst_ttl_secs: 1.2,
            alert_ttl_secs: 3.0,
            milestone_ttl_secs: 5.0,

            log_capacity: 200,
            snapshot_log_entries: 50,
        }
    }
}

impl SimulationConfig {
    /// Simulation seconds covered by one tick
    pub fn tick_dt(&self) -> f64 {
        1.0 / self.tick_rate_hz
    }
}

/// Configuration for the wall-clock environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// First daylight hour (local time)
    pub day_start_hour: u32,

    /// First night hour (local time)
    pub night_start_hour: u32,

    /// Length of one weather forecast window (seconds)
    ///
    /// A new candidate weather is picked once per window.
    pub weather_period_secs: i64,

    /// Minimum time a weather holds before it may change (seconds)
    ///
    /// Must be at least one period so a pick can never be replaced by the
    /// very next candidate.
    pub weather_min_hold_secs: i64,

    /// Seed mixed into weather picks
    pub weather_seed: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            day_start_hour: 6,
            night_start_hour: 19,
            weather_period_secs: 300,
            weather_min_hold_secs: 600,
            weather_seed: 0x5EED,
        }
    }
}

impl TidepoolConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TidepoolConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        let env = &self.environment;
        let ingest = &self.ingest;

        if !(sim.tick_rate_hz.is_finite() && sim.tick_rate_hz > 0.0 && sim.tick_rate_hz <= 240.0) {
            return Err(invalid(format!(
                "tick_rate_hz ({}) must be in (0, 240]",
                sim.tick_rate_hz
            )));
        }

        if ingest.queue_capacity == 0 {
            return Err(invalid("queue_capacity must be at least 1".into()));
        }

        if ingest.max_message_bytes < 64 {
            return Err(invalid(format!(
                "max_message_bytes ({}) is too small to hold an event",
                ingest.max_message_bytes
            )));
        }

        if ingest.read_timeout_ms == 0 {
            return Err(invalid("read_timeout_ms must be positive".into()));
        }

        let durations = [
            ("entry_secs", sim.entry_secs),
            ("exit_secs", sim.exit_secs),
            ("orphan_linger_secs", sim.orphan_linger_secs),
            ("orphan_stop_linger_secs", sim.orphan_stop_linger_secs),
            ("label_ttl_secs", sim.label_ttl_secs),
            ("tool_effect_ttl_secs", sim.tool_effect_ttl_secs),
            ("burst_ttl_secs", sim.burst_ttl_secs),
            ("alert_ttl_secs", sim.alert_ttl_secs),
            ("milestone_ttl_secs", sim.milestone_ttl_secs),
        ];
        for (name, value) in durations {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!("{} ({}) must be positive", name, value)));
            }
        }

        // Spawned phase must end before the effect expires
        if sim.tool_effect_spawn_secs >= sim.tool_effect_ttl_secs {
            return Err(invalid(format!(
                "tool_effect_spawn_secs ({}) should be < tool_effect_ttl_secs ({})",
                sim.tool_effect_spawn_secs, sim.tool_effect_ttl_secs
            )));
        }

        if sim.ambient_min > sim.ambient_max {
            return Err(invalid(format!(
                "ambient_min ({}) should be <= ambient_max ({})",
                sim.ambient_min, sim.ambient_max
            )));
        }

        if !(0.0..=1.0).contains(&sim.ambient_spawn_chance) {
            return Err(invalid("ambient_spawn_chance must be within 0..=1".into()));
        }
        if !(0.0..=1.0).contains(&sim.tool_creature_chance) {
            return Err(invalid("tool_creature_chance must be within 0..=1".into()));
        }

        if sim.snapshot_log_entries > sim.log_capacity {
            return Err(invalid(format!(
                "snapshot_log_entries ({}) should be <= log_capacity ({})",
                sim.snapshot_log_entries, sim.log_capacity
            )));
        }

        if env.day_start_hour >= 24 || env.night_start_hour >= 24 {
            return Err(invalid("day/night hours must be within 0..24".into()));
        }
        if env.day_start_hour >= env.night_start_hour {
            return Err(invalid(format!(
                "day_start_hour ({}) should be < night_start_hour ({})",
                env.day_start_hour, env.night_start_hour
            )));
        }

        if env.weather_period_secs <= 0 {
            return Err(invalid("weather_period_secs must be positive".into()));
        }
        if env.weather_min_hold_secs < env.weather_period_secs {
            return Err(invalid(format!(
                "weather_min_hold_secs ({}) should be >= weather_period_secs ({})",
                env.weather_min_hold_secs, env.weather_period_secs
            )));
        }

        Ok(())
    }
}

fn invalid(message: String) -> TidepoolError {
    TidepoolError::InvalidConfig(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TidepoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TidepoolConfig::from_toml_str(
            r#"
            [ingest]
            queue_capacity = 42

            [simulation]
            tick_rate_hz = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(config.ingest.queue_capacity, 42);
        assert_eq!(config.simulation.tick_rate_hz, 30.0);
        assert_eq!(config.ingest.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
        assert_eq!(config.simulation.tool_milestones, vec![20, 100, 500]);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = TidepoolConfig::from_toml_str("").unwrap();
        assert_eq!(config, TidepoolConfig::default());
    }

    #[test]
    fn test_rejects_zero_queue_capacity() {
        let mut config = TidepoolConfig::default();
        config.ingest.queue_capacity = 0;
        assert!(matches!(config.validate(), Err(TidepoolError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_tick_rate() {
        let mut config = TidepoolConfig::default();
        config.simulation.tick_rate_hz = 0.0;
        assert!(config.validate().is_err());
        config.simulation.tick_rate_hz = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_creature_chance_above_one() {
        let mut config = TidepoolConfig::default();
        config.simulation.tool_creature_chance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_day_night() {
        let mut config = TidepoolConfig::default();
        config.environment.day_start_hour = 20;
        config.environment.night_start_hour = 7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_short_weather_hold() {
        let mut config = TidepoolConfig::default();
        config.environment.weather_min_hold_secs = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = TidepoolConfig::from_toml_str("[ingest\nqueue_capacity = ").unwrap_err();
        assert!(matches!(err, TidepoolError::ConfigParse(_)));
    }

    #[test]
    fn test_tick_dt() {
        let config = SimulationConfig::default();
        assert!((config.tick_dt() - 0.05).abs() < 1e-12);
    }
}
