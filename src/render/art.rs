//! ASCII art for every creature in the tank

use crate::core::types::Facing;
use crate::event::MAIN_AGENT_ID;
use crate::simulation::entity::{AmbientSpecies, ToolStyle};

/// A drawing with a right-facing and a left-facing variant
#[derive(Debug, Clone, Copy)]
pub struct Sprite {
    pub right: &'static [&'static str],
    pub left: &'static [&'static str],
    pub width: u16,
    pub height: u16,
}

impl Sprite {
    pub fn lines(&self, facing: Facing) -> &'static [&'static str] {
        match facing {
            Facing::Right => self.right,
            Facing::Left => self.left,
        }
    }
}

const fn symmetric(lines: &'static [&'static str], width: u16) -> Sprite {
    Sprite {
        right: lines,
        left: lines,
        width,
        height: lines.len() as u16,
    }
}

pub const FISH_SMALL: Sprite = Sprite {
    right: &["><(((°>"],
    left: &["<°)))><"],
    width: 7,
    height: 1,
};

pub const FISH_MEDIUM: Sprite = Sprite {
    right: &["><((°>"],
    left: &["<°))><"],
    width: 6,
    height: 1,
};

pub const FISH_LARGE: Sprite = Sprite {
    right: &["  .  . ", "><(°)> ", "  `  ' "],
    left: &[" .  .  ", " <(°)><", " '  `  "],
    width: 7,
    height: 3,
};

pub const FISH_DECORATED: Sprite = Sprite {
    right: &["   __  ", "><(oo)>", "  (__) "],
    left: &["  __   ", "<(oo)><", " (__)  "],
    width: 7,
    height: 3,
};

/// The main session agent
pub const TURTLE: Sprite = Sprite {
    right: &["  .----.  _    ", ",_/      \\/(_) ", "'~uu----uu'    "],
    left: &["   _  .----.   ", "  (_\\/      \\_,", "    'uu----uu~'"],
    width: 15,
    height: 3,
};

pub const SAILBOAT: Sprite = Sprite {
    right: &["    ,~     ", "    |\\     ", "   /| \\    ", " _/__|__\\_ ", "  '======'  "],
    left: &["     ~,    ", "     /|    ", "    / |\\   ", " _/__|__\\_ ", "  '======'  "],
    width: 11,
    height: 5,
};

pub const DOLPHIN: Sprite = Sprite {
    right: &["       ,   ", "     __/)  ", "\\_.-' a '-.", "/~~'``(/~^^'"],
    left: &["   ,       ", "  (\\__     ", ".-' a '-._/", "'^^~\\)``'~~\\"],
    width: 12,
    height: 4,
};

pub const AMBIENT_FISH: Sprite = Sprite {
    right: &["-><>"],
    left: &["<><-"],
    width: 4,
    height: 1,
};

pub const JELLYFISH: [Sprite; 2] = [
    symmetric(&[" .-. ", "(   )", " /|\\ "], 5),
    symmetric(&[" .-. ", "(   )", " \\|/ "], 5),
];

pub const BIRD: [Sprite; 2] = [symmetric(&["/^v^\\"], 5), symmetric(&["-.v.-"], 5)];

/// Sea floor marker for a completed task
pub const SHELL: Sprite = symmetric(&["\\_^_/"], 5);

pub const SUN: Sprite = symmetric(&[" \\ | / ", "- O - ", " / | \\ "], 7);

pub const MOON: Sprite = symmetric(&[" _  ", "( ) ", " ~  "], 4);

pub const CLOUDS: [Sprite; 2] = [
    symmetric(&[" .-(  ).  ", "(  __  )  "], 10),
    symmetric(&[" .--.  ", "(    ) "], 7),
];

pub const STAR_CHARS: [char; 3] = ['.', '*', '+'];

pub const WAVE_PATTERN: [&str; 2] = ["~^", "^~"];

pub const FLOOR_PATTERN: &str = ",._.:'\"._.,:'\"";

pub const SHRIMP: Sprite = Sprite {
    right: &["~}>"],
    left: &["<{~"],
    width: 3,
    height: 1,
};

pub const TINY_FISH: Sprite = Sprite {
    right: &[">°>"],
    left: &["<°<"],
    width: 3,
    height: 1,
};

pub const CRAB: Sprite = symmetric(&[",V,"], 3);

pub const BUBBLE: char = 'o';

/// Pick the fish drawn for an agent
pub fn agent_sprite(agent_id: &str, agent_type: Option<&str>) -> &'static Sprite {
    if agent_id == MAIN_AGENT_ID {
        return &TURTLE;
    }
    match agent_type {
        Some("Explore") => &FISH_SMALL,
        Some("Plan" | "code-reviewer" | "code-simplifier") => &FISH_LARGE,
        Some(t) if t.starts_with("feature-dev:") || t.starts_with("superpowers:") => &FISH_DECORATED,
        _ => &FISH_MEDIUM,
    }
}

/// Creature for an MCP tool effect; plain tools are drawn as a bubble
pub fn tool_sprite(style: ToolStyle) -> Option<&'static Sprite> {
    match style {
        ToolStyle::Bubble => None,
        ToolStyle::Sailboat => Some(&SAILBOAT),
        ToolStyle::Dolphin => Some(&DOLPHIN),
        ToolStyle::Shrimp => Some(&SHRIMP),
        ToolStyle::SmallFish => Some(&TINY_FISH),
        ToolStyle::Crab => Some(&CRAB),
    }
}

/// Ambient creature sprite for an animation frame
pub fn ambient_sprite(species: AmbientSpecies, frame: u64) -> &'static Sprite {
    let idx = (frame % 2) as usize;
    match species {
        AmbientSpecies::Jellyfish => &JELLYFISH[idx],
        AmbientSpecies::Fish => &AMBIENT_FISH,
        AmbientSpecies::Bird => &BIRD[idx],
    }
}
