//! Color definitions for creatures, sky and water

use ratatui::style::Color as TermColor;

use crate::simulation::entity::{AgentPhase, AmbientSpecies, ExitVariant, ToolStyle};
use crate::simulation::environment::{EnvironmentState, Weather};

/// RGB color (0.0 to 1.0 per channel)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Darken color by a factor (0.0 = black, 1.0 = unchanged)
    pub fn darken(&self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        Self {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
        }
    }

    /// Move toward `other` by `t` (0.0 = self, 1.0 = other)
    pub fn mix(&self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    pub fn to_term(self) -> TermColor {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        TermColor::Rgb(channel(self.r), channel(self.g), channel(self.b))
    }
}

pub const DAY_SKY: Color = Color::new(0.45, 0.7, 0.95);
pub const NIGHT_SKY: Color = Color::new(0.03, 0.04, 0.12);
pub const STORM_SKY: Color = Color::new(0.3, 0.32, 0.36);
pub const WATER: Color = Color::new(0.05, 0.3, 0.6);
pub const DEEP_WATER: Color = Color::new(0.02, 0.1, 0.3);
pub const SAND: Color = Color::new(0.8, 0.7, 0.45);
pub const FOAM: Color = Color::new(0.85, 0.95, 1.0);
pub const LABEL: Color = Color::new(0.95, 0.95, 0.85);
pub const ALERT: Color = Color::new(1.0, 0.3, 0.25);
pub const GOLD: Color = Color::new(1.0, 0.85, 0.2);

/// Never darken below this, so creatures stay visible at night
const MIN_BRIGHTNESS: f32 = 0.45;

pub fn sky_color(env: &EnvironmentState) -> Color {
    let base = NIGHT_SKY.mix(DAY_SKY, env.light_level);
    match env.weather {
        Weather::Storm | Weather::Rain => base.mix(STORM_SKY, 0.5),
        Weather::Fog | Weather::Cloudy => base.mix(STORM_SKY, 0.25),
        Weather::Clear => base,
    }
}

pub fn water_color(env: &EnvironmentState, depth: f32) -> Color {
    WATER.mix(DEEP_WATER, depth).darken(0.5 + env.light_level * 0.5)
}

pub fn agent_color(phase: AgentPhase, exit: Option<ExitVariant>, orphan: bool) -> Color {
    match (phase, exit) {
        (AgentPhase::Exiting, Some(ExitVariant::Error)) => Color::new(0.6, 0.6, 0.6),
        (AgentPhase::Exiting, _) => Color::new(0.5, 0.8, 0.9),
        (AgentPhase::Entering, _) => Color::new(1.0, 0.9, 0.5),
        _ if orphan => Color::new(0.8, 0.6, 0.9),
        _ => Color::new(1.0, 0.6, 0.2),
    }
}

pub fn tool_color(style: ToolStyle) -> Color {
    match style {
        ToolStyle::Bubble => FOAM,
        ToolStyle::Sailboat => Color::new(0.95, 0.95, 0.95),
        ToolStyle::Dolphin => Color::new(0.6, 0.7, 0.8),
        ToolStyle::Shrimp => Color::new(1.0, 0.6, 0.55),
        ToolStyle::SmallFish => Color::new(0.7, 0.9, 1.0),
        ToolStyle::Crab => Color::new(0.95, 0.35, 0.2),
    }
}

pub fn ambient_color(species: AmbientSpecies) -> Color {
    match species {
        AmbientSpecies::Jellyfish => Color::new(0.9, 0.5, 0.9),
        AmbientSpecies::Fish => Color::new(0.4, 0.9, 0.6),
        AmbientSpecies::Bird => Color::new(0.2, 0.2, 0.25),
    }
}

/// Dim a creature color for the ambient light level
pub fn lit(base: Color, light_level: f32) -> Color {
    base.darken(MIN_BRIGHTNESS + (1.0 - MIN_BRIGHTNESS) * light_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_darken_scales_channels() {
        let white = Color::new(1.0, 1.0, 1.0);
        let dim = white.darken(0.6);
        assert!((dim.r - 0.6).abs() < 0.01);
        assert_eq!(white.darken(2.0), white);
    }

    #[test]
    fn test_mix_endpoints() {
        assert_eq!(NIGHT_SKY.mix(DAY_SKY, 0.0), NIGHT_SKY);
        assert_eq!(NIGHT_SKY.mix(DAY_SKY, 1.0), DAY_SKY);
    }

    #[test]
    fn test_lit_keeps_minimum_brightness() {
        let white = Color::new(1.0, 1.0, 1.0);
        assert!((lit(white, 0.0).r - MIN_BRIGHTNESS).abs() < 0.01);
        assert_eq!(lit(white, 1.0), white);
    }

    #[test]
    fn test_to_term_rgb() {
        assert_eq!(Color::new(1.0, 0.0, 0.5).to_term(), TermColor::Rgb(255, 0, 128));
    }
}
