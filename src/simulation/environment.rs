//! Environment clock - day/night, moon and weather from local wall time
//!
//! Everything here is a pure function of the sampled time, except the
//! current weather which is held until a different pick has lasted at least
//! `weather_min_hold_secs`. Sampling every tick therefore never flickers.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::core::EnvironmentConfig;

/// Mean synodic month in days
pub const SYNODIC_MONTH_DAYS: f64 = 29.530588853;

/// Maximum light the moon adds at night
pub const MOON_LIGHT_MAX: f32 = 0.15;

/// Solar phase - 9 phases of the day with fixed hour ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolarPhase {
    /// 00:00-04:00
    DeepNight,
    /// 04:00-06:00
    PreDawn,
    /// 06:00-08:00
    Dawn,
    /// 08:00-11:00
    Morning,
    /// 11:00-14:00
    Midday,
    /// 14:00-17:00
    Afternoon,
    /// 17:00-19:00
    Dusk,
    /// 19:00-22:00
    Evening,
    /// 22:00-00:00
    Night,
}

impl SolarPhase {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=3 => SolarPhase::DeepNight,
            4..=5 => SolarPhase::PreDawn,
            6..=7 => SolarPhase::Dawn,
            8..=10 => SolarPhase::Morning,
            11..=13 => SolarPhase::Midday,
            14..=16 => SolarPhase::Afternoon,
            17..=18 => SolarPhase::Dusk,
            19..=21 => SolarPhase::Evening,
            _ => SolarPhase::Night,
        }
    }

    /// Base light level for this phase (0.0-1.0)
    pub fn base_light_level(&self) -> f32 {
        match self {
            SolarPhase::DeepNight => 0.0,
            SolarPhase::PreDawn => 0.1,
            SolarPhase::Dawn => 0.5,
            SolarPhase::Morning => 0.8,
            SolarPhase::Midday => 1.0,
            SolarPhase::Afternoon => 0.85,
            SolarPhase::Dusk => 0.5,
            SolarPhase::Evening => 0.2,
            SolarPhase::Night => 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Relative odds of each weather, in [`Weather::ALL`] order
    fn weather_weights(&self) -> [u64; 5] {
        match self {
            Season::Spring => [40, 25, 25, 5, 5],
            Season::Summer => [55, 20, 10, 10, 5],
            Season::Autumn => [30, 30, 20, 5, 15],
            Season::Winter => [30, 35, 15, 5, 15],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weather {
    Clear,
    Cloudy,
    Rain,
    Storm,
    Fog,
}

impl Weather {
    pub const ALL: [Weather; 5] = [
        Weather::Clear,
        Weather::Cloudy,
        Weather::Rain,
        Weather::Storm,
        Weather::Fog,
    ];

    /// Light multiplier applied on top of the solar level
    pub fn light_factor(&self) -> f32 {
        match self {
            Weather::Clear => 1.0,
            Weather::Cloudy => 0.85,
            Weather::Rain => 0.7,
            Weather::Storm => 0.5,
            Weather::Fog => 0.75,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Clear => "clear",
            Weather::Cloudy => "cloudy",
            Weather::Rain => "rain",
            Weather::Storm => "storm",
            Weather::Fog => "fog",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkyBody {
    Sun,
    Moon,
}

/// Everything the renderer needs to draw sky and water for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentState {
    pub hour: u32,
    pub minute: u32,
    pub phase: SolarPhase,
    pub season: Season,
    pub is_night: bool,
    pub sky_body: SkyBody,
    /// 0.0 = new, 0.5 = full, 1.0 = new again
    pub moon_phase: f32,
    pub light_level: f32,
    pub weather: Weather,
}

impl EnvironmentState {
    pub fn is_moon_full(&self) -> bool {
        (self.moon_phase - 0.5).abs() < 0.05
    }
}

/// Moon phase for a moment in time
pub fn moon_phase(at: NaiveDateTime) -> f32 {
    let reference = NaiveDate::from_ymd_opt(2000, 1, 6)
        .and_then(|d| d.and_hms_opt(18, 14, 0))
        .unwrap_or_default();
    let days = (at - reference).num_seconds() as f64 / 86_400.0;
    (days.rem_euclid(SYNODIC_MONTH_DAYS) / SYNODIC_MONTH_DAYS) as f32
}

/// Light the moon adds at night (0.0 at new, [`MOON_LIGHT_MAX`] at full)
pub fn moon_light(phase: f32) -> f32 {
    let illumination = if phase <= 0.5 {
        phase * 2.0
    } else {
        (1.0 - phase) * 2.0
    };
    illumination * MOON_LIGHT_MAX
}

fn simple_hash(seed: u64, modifier: u64) -> u64 {
    let mut h = seed.wrapping_add(modifier);
    h = h.wrapping_mul(6364136223846793005);
    h = h.wrapping_add(1442695040888963407);
    h ^ (h >> 32)
}

/// Deterministic weather pick for one forecast window
pub fn weather_for_window(seed: u64, window: i64, season: Season) -> Weather {
    let weights = season.weather_weights();
    let total: u64 = weights.iter().sum();
    let mut roll = simple_hash(seed, window as u64) % total;
    for (weather, weight) in Weather::ALL.iter().zip(weights) {
        if roll < weight {
            return *weather;
        }
        roll -= weight;
    }
    Weather::Clear
}

#[derive(Debug, Clone)]
pub struct EnvironmentClock {
    config: EnvironmentConfig,
    weather: Option<Weather>,
    /// Unix second the current weather took effect
    weather_since: i64,
}

impl EnvironmentClock {
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            config,
            weather: None,
            weather_since: 0,
        }
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn sample(&mut self, now: NaiveDateTime) -> EnvironmentState {
        let hour = now.hour();
        let phase = SolarPhase::from_hour(hour);
        let season = Season::from_month(now.month());
        let is_night = hour < self.config.day_start_hour || hour >= self.config.night_start_hour;
        let moon_phase = moon_phase(now);
        let weather = self.update_weather(now.and_utc().timestamp(), season);

        let mut light = phase.base_light_level();
        if is_night {
            light += moon_light(moon_phase);
        }
        let light_level = (light * weather.light_factor()).clamp(0.0, 1.0);

        EnvironmentState {
            hour,
            minute: now.minute(),
            phase,
            season,
            is_night,
            sky_body: if is_night { SkyBody::Moon } else { SkyBody::Sun },
            moon_phase,
            light_level,
            weather,
        }
    }

    fn update_weather(&mut self, unix: i64, season: Season) -> Weather {
        let window = unix.div_euclid(self.config.weather_period_secs.max(1));
        let candidate = weather_for_window(self.config.weather_seed, window, season);

        let current = match self.weather {
            None => {
                self.weather_since = unix;
                self.weather = Some(candidate);
                return candidate;
            }
            Some(current) => current,
        };

        if unix < self.weather_since {
            // Clock went backwards; restart the hold from here
            self.weather_since = unix;
            return current;
        }
        if candidate != current && unix - self.weather_since >= self.config.weather_min_hold_secs {
            tracing::debug!(from = current.as_str(), to = candidate.as_str(), "weather changed");
            self.weather = Some(candidate);
            self.weather_since = unix;
            return candidate;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap()
    }

    #[test]
    fn test_solar_phase_from_hour() {
        assert_eq!(SolarPhase::from_hour(0), SolarPhase::DeepNight);
        assert_eq!(SolarPhase::from_hour(4), SolarPhase::PreDawn);
        assert_eq!(SolarPhase::from_hour(7), SolarPhase::Dawn);
        assert_eq!(SolarPhase::from_hour(12), SolarPhase::Midday);
        assert_eq!(SolarPhase::from_hour(18), SolarPhase::Dusk);
        assert_eq!(SolarPhase::from_hour(23), SolarPhase::Night);
    }

    #[test]
    fn test_day_and_night() {
        let mut clock = EnvironmentClock::new(EnvironmentConfig::default());
        let noon = clock.sample(at(6, 1, 12, 0));
        assert!(!noon.is_night);
        assert_eq!(noon.sky_body, SkyBody::Sun);
        assert_eq!(noon.season, Season::Summer);

        let late = clock.sample(at(6, 1, 23, 30));
        assert!(late.is_night);
        assert_eq!(late.sky_body, SkyBody::Moon);
        assert!(late.light_level < noon.light_level);
    }

    #[test]
    fn test_moon_phase_known_dates() {
        let new_moon = NaiveDate::from_ymd_opt(2000, 1, 6)
            .and_then(|d| d.and_hms_opt(18, 14, 0))
            .unwrap();
        assert!(moon_phase(new_moon) < 0.01);
        let full = new_moon + Duration::hours((SYNODIC_MONTH_DAYS * 12.0) as i64);
        assert!((moon_phase(full) - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_moon_light_contribution() {
        assert!((moon_light(0.5) - MOON_LIGHT_MAX).abs() < 1e-6);
        assert!(moon_light(0.0) < 1e-6);
        assert!((moon_light(0.25) - moon_light(0.75)).abs() < 1e-6);
    }

    #[test]
    fn test_weather_pick_is_deterministic() {
        for window in 0..50 {
            assert_eq!(
                weather_for_window(7, window, Season::Autumn),
                weather_for_window(7, window, Season::Autumn)
            );
        }
    }

    #[test]
    fn test_weather_holds_between_samples() {
        let mut clock = EnvironmentClock::new(EnvironmentConfig::default());
        let start = at(3, 10, 9, 0);
        let first = clock.sample(start).weather;
        // Every sample inside the hold window keeps the first pick
        for secs in (0..600).step_by(20) {
            let state = clock.sample(start + Duration::seconds(secs));
            assert_eq!(state.weather, first);
        }
    }

    #[test]
    fn test_weather_eventually_changes() {
        let mut clock = EnvironmentClock::new(EnvironmentConfig::default());
        let start = at(10, 1, 0, 0);
        let first = clock.sample(start).weather;
        let changed = (1..2000)
            .map(|i| clock.sample(start + Duration::seconds(i * 300)).weather)
            .any(|w| w != first);
        assert!(changed);
    }

    #[test]
    fn test_clock_going_backwards_keeps_weather() {
        let mut clock = EnvironmentClock::new(EnvironmentConfig::default());
        let start = at(5, 5, 14, 0);
        let first = clock.sample(start).weather;
        let earlier = clock.sample(start - Duration::hours(5)).weather;
        assert_eq!(first, earlier);
    }

    #[test]
    fn test_weather_dims_light() {
        assert!(Weather::Storm.light_factor() < Weather::Cloudy.light_factor());
        assert_eq!(Weather::Clear.light_factor(), 1.0);
    }
}
